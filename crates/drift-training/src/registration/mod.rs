//! Dataset registration stage.

pub mod data_asset;

use crate::clock::Clock;
use crate::config::{JobConfig, RegistrationParameters};
use crate::error::TrainingResult;
use crate::pipeline::{AdditionalArgs, Transformer};
use crate::signal::{TaskValues, DATA_ASSET_VERSION_KEY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drift_abstraction::WorkspaceConnector;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub use data_asset::{path_asset_name, DataAssetRegistrator};

/// Pipeline stage `register`: publishes a new version of the training data.
pub struct DatasetRegistrator {
    connector: Arc<dyn WorkspaceConnector>,
    task_values: Arc<dyn TaskValues>,
    clock: Arc<dyn Clock>,
    staging_dir: PathBuf,
}

impl DatasetRegistrator {
    pub const NAME: &'static str = "register";

    #[must_use]
    pub fn new(
        connector: Arc<dyn WorkspaceConnector>,
        task_values: Arc<dyn TaskValues>,
        clock: Arc<dyn Clock>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { connector, task_values, clock, staging_dir: staging_dir.into() }
    }

    pub fn load_parameters(config: &JobConfig) -> TrainingResult<RegistrationParameters> {
        config.registration_parameters()
    }

    /// Returns `(version, delta_timestamp)` for `now`.
    #[must_use]
    pub fn compute_version(now: DateTime<Utc>) -> (String, String) {
        (now.format("%Y%m%d%H%M%S").to_string(), now.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    pub fn publish_new_version(&self, version: &str) -> TrainingResult<()> {
        self.task_values.set(DATA_ASSET_VERSION_KEY, version)?;
        info!(version = %version, "Published new data asset version");
        Ok(())
    }
}

#[async_trait]
impl Transformer for DatasetRegistrator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn featurize(&self, config: &JobConfig, args: &AdditionalArgs) -> TrainingResult<()> {
        let parameters = Self::load_parameters(config)?;
        let (version, delta_timestamp) = Self::compute_version(self.clock.now());

        let workspace = self.connector.connect(&config.workspace_settings(&args.vault_name)?).await?;

        let registrator = DataAssetRegistrator::new(
            workspace.assets,
            workspace.tables,
            workspace.service_principal,
            parameters,
            version.clone(),
            delta_timestamp,
            self.staging_dir.clone(),
        );
        registrator.register_dataset().await?;

        self.publish_new_version(&version)
    }
}
