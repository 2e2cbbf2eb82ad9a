//! Job configuration files.
//!
//! A job configuration names the pipeline stage to run and carries its
//! parameters:
//!
//! ```toml
//! [processing]
//! type = "retrain"
//!
//! [parameters]
//! refreshTimeout = "3600"
//! refreshDelay = "30"
//!
//! [parameters.azml]
//! subscriptionId = "..."
//! resourceGroup = "..."
//! mlWorkspaceName = "..."
//!
//! [[parameters.dataAssets]]
//! name = "training_data"
//! value = "azureml:sales-history-uri"
//! ```
//!
//! JSON files with the same shape are accepted when the path ends in `.json`.

use crate::error::{TrainingError, TrainingResult};
use drift_abstraction::WorkspaceSettings;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub parameters: JobParameters,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Name of the stage to run (`register` or `retrain`).
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzmlParameters {
    pub subscription_id: String,
    pub resource_group: String,
    pub ml_workspace_name: String,
}

/// A monitored data asset: the job input `name` and the asset identifier
/// (`value`) its path must start with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAssetRef {
    pub name: String,
    pub value: String,
}

impl DataAssetRef {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParameters {
    #[serde(default)]
    pub azml: Option<AzmlParameters>,
    #[serde(default)]
    pub storage_account_name: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub container_data_path: Option<String>,
    #[serde(default)]
    pub data_assets: Option<Vec<DataAssetRef>>,
    #[serde(default, deserialize_with = "deserialize_seconds")]
    pub refresh_timeout: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_seconds")]
    pub refresh_delay: Option<u64>,
    #[serde(default, rename = "model_name_prefix")]
    pub model_name_prefix: Option<String>,
}

/// Polling bounds for the training status refresher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    pub timeout: Duration,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrainingSettings {
    pub data_assets: Vec<DataAssetRef>,
    pub refresh: RefreshSettings,
    pub model_name_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationParameters {
    pub subscription_id: String,
    pub resource_group: String,
    pub ml_workspace_name: String,
    pub storage_account_name: String,
    pub container_name: String,
    pub container_path: String,
}

impl JobConfig {
    pub fn load(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrainingError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let is_json = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| TrainingError::Config(format!("{}: {}", path.display(), e)))
        } else {
            Self::from_toml_str(&content)
                .map_err(|e| TrainingError::Config(format!("{}: {}", path.display(), e)))
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn azml(&self) -> TrainingResult<&AzmlParameters> {
        self.parameters
            .azml
            .as_ref()
            .ok_or_else(|| TrainingError::Config("missing parameter: azml".to_string()))
    }

    pub fn workspace_settings(&self, vault_name: &str) -> TrainingResult<WorkspaceSettings> {
        let azml = self.azml()?;
        Ok(WorkspaceSettings {
            subscription_id: azml.subscription_id.clone(),
            resource_group: azml.resource_group.clone(),
            workspace_name: azml.ml_workspace_name.clone(),
            vault_name: vault_name.to_string(),
        })
    }

    /// Settings of the retraining stage. `prefix_override` (from the command
    /// line) wins over `model_name_prefix` in the file.
    pub fn retraining_settings(&self, prefix_override: Option<&str>) -> TrainingResult<RetrainingSettings> {
        let params = &self.parameters;
        let data_assets = required(params.data_assets.clone(), "dataAssets")?;
        let timeout = required(params.refresh_timeout, "refreshTimeout")?;
        let delay = required(params.refresh_delay, "refreshDelay")?;

        let model_name_prefix = prefix_override
            .map(str::to_string)
            .or_else(|| params.model_name_prefix.clone())
            .filter(|p| !p.trim().is_empty());

        Ok(RetrainingSettings {
            data_assets,
            refresh: RefreshSettings {
                timeout: Duration::from_secs(timeout),
                delay: Duration::from_secs(delay),
            },
            model_name_prefix,
        })
    }

    pub fn registration_parameters(&self) -> TrainingResult<RegistrationParameters> {
        let azml = self.azml()?;
        let params = &self.parameters;
        Ok(RegistrationParameters {
            subscription_id: azml.subscription_id.clone(),
            resource_group: azml.resource_group.clone(),
            ml_workspace_name: azml.ml_workspace_name.clone(),
            storage_account_name: required(params.storage_account_name.clone(), "storageAccountName")?,
            container_name: required(params.container_name.clone(), "containerName")?,
            container_path: required(params.container_data_path.clone(), "containerDataPath")?,
        })
    }
}

fn required<T>(value: Option<T>, key: &str) -> TrainingResult<T> {
    value.ok_or_else(|| TrainingError::Config(format!("missing parameter: {key}")))
}

/// Accepts `"30"` as well as `30`.
fn deserialize_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(n)),
        Some(Seconds::Text(text)) => text.trim().parse::<u64>().map(Some).map_err(|e| {
            serde::de::Error::custom(format!("expected a number of seconds, got {text:?}: {e}"))
        }),
    }
}
