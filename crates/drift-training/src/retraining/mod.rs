//! Model retraining stage.

pub mod job_group;
pub mod refresher;
pub mod retrainer;
pub mod scope;

use crate::clock::Clock;
use crate::config::JobConfig;
use crate::error::{TrainingError, TrainingResult};
use crate::pipeline::{AdditionalArgs, Transformer};
use crate::signal::{TaskValues, DATA_ASSET_VERSION_KEY};
use async_trait::async_trait;
use drift_abstraction::WorkspaceConnector;
use std::sync::Arc;
use tracing::info;

pub use job_group::{JobGroup, TrainingTimestamp};
pub use refresher::TrainingStatusRefresher;
pub use retrainer::{create_new_display_name, select_latest_per_group, ModelRetrainer};
pub use scope::{job_name_pattern, ScopeFilter};

/// Pipeline stage `retrain`.
pub struct RetrainStage {
    connector: Arc<dyn WorkspaceConnector>,
    task_values: Arc<dyn TaskValues>,
    clock: Arc<dyn Clock>,
}

impl RetrainStage {
    pub const NAME: &'static str = "retrain";

    #[must_use]
    pub fn new(connector: Arc<dyn WorkspaceConnector>, task_values: Arc<dyn TaskValues>, clock: Arc<dyn Clock>) -> Self {
        Self { connector, task_values, clock }
    }

    /// The version given on the command line, else the one published by the
    /// registration stage.
    fn resolve_data_asset_version(&self, args: &AdditionalArgs) -> TrainingResult<String> {
        if let Some(version) = &args.data_asset_version {
            return Ok(version.clone());
        }
        self.task_values.get(DATA_ASSET_VERSION_KEY)?.ok_or_else(|| {
            TrainingError::Config(format!(
                "no data asset version given and no {DATA_ASSET_VERSION_KEY} task value published"
            ))
        })
    }
}

#[async_trait]
impl Transformer for RetrainStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn featurize(&self, config: &JobConfig, args: &AdditionalArgs) -> TrainingResult<()> {
        let settings = config.retraining_settings(args.model_name_prefix.as_deref())?;
        let data_asset_version = self.resolve_data_asset_version(args)?;
        for data_asset in &settings.data_assets {
            info!(name = %data_asset.name, value = %data_asset.value, "Monitored data asset");
        }

        let workspace = self.connector.connect(&config.workspace_settings(&args.vault_name)?).await?;
        let retrainer = ModelRetrainer::new(workspace.jobs, self.clock.clone(), &settings)?;
        retrainer.run(&data_asset_version).await
    }
}
