//! Runs the stage named by a job configuration.

use crate::config::JobConfig;
use crate::error::{TrainingError, TrainingResult};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Run-wide arguments supplied by the entrypoint rather than the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalArgs {
    pub data_asset_version: Option<String>,
    pub vault_name: String,
    pub model_name_prefix: Option<String>,
}

/// A pipeline stage.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Value of `processing.type` selecting this stage.
    fn name(&self) -> &'static str;

    async fn featurize(&self, config: &JobConfig, args: &AdditionalArgs) -> TrainingResult<()>;
}

#[derive(Default)]
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    pub async fn run(&self, config_path: &Path, args: &AdditionalArgs) -> TrainingResult<()> {
        info!(config = %config_path.display(), "Loading job configuration");
        let config = JobConfig::load(config_path)?;
        self.run_config(&config, args).await
    }

    pub async fn run_config(&self, config: &JobConfig, args: &AdditionalArgs) -> TrainingResult<()> {
        let stage = config.processing.kind.as_str();
        let transformer = self.transformers.iter().find(|t| t.name() == stage).ok_or_else(|| {
            TrainingError::Config(format!(
                "unknown processing type {stage:?}, expected one of: {}",
                self.stage_names().join(", ")
            ))
        })?;

        info!(stage = %stage, "Running stage");
        transformer.featurize(config, args).await?;
        info!(stage = %stage, "Stage completed");
        Ok(())
    }
}
