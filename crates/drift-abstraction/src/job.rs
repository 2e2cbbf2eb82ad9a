//! Job records owned by the ML platform and the client used to manage them.

use crate::error::PlatformResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a platform job.
///
/// Only `Completed` and `Failed` are interpreted by the retraining core; every
/// other state the platform reports is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Other(s) => s.as_str(),
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Other("Unknown".to_string())
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Running" => Self::Running,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        match value {
            JobStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named input declared by a job.
///
/// `path` is the resource path (e.g. `azureml:my-asset:3`); literal inputs
/// have none. Any other platform field is kept in `extra` so that a record can
/// be sent back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobInput {
    #[must_use]
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), extra: serde_json::Map::new() }
    }
}

/// A job as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Platform identifier. `None` asks the platform to create a new job.
    pub name: Option<String>,
    /// Human readable name, `<group>_<timestamp>_<suffix>` for retrainable jobs.
    pub display_name: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub inputs: BTreeMap<String, JobInput>,
    /// Remaining platform properties, passed through untouched on resubmission.
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl JobRecord {
    #[must_use]
    pub fn input_path(&self, input_name: &str) -> Option<&str> {
        self.inputs.get(input_name).and_then(|input| input.path.as_deref())
    }

    /// Label used in logs: `display_name (name)`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", self.display_name, name),
            None => self.display_name.clone(),
        }
    }
}

/// Job management operations of the platform workspace.
///
/// Calls are awaited one at a time by the retraining core; implementations are
/// not expected to retry.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Lists every job visible in the workspace.
    async fn list_jobs(&self) -> PlatformResult<Vec<JobRecord>>;

    /// Fetches the current state of one job.
    async fn get_job(&self, name: &str) -> PlatformResult<JobRecord>;

    /// Creates (when `job.name` is `None`) or updates a job and returns the
    /// record the platform stored.
    async fn create_or_update_job(&self, job: &JobRecord) -> PlatformResult<JobRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_platform_strings() {
        assert_eq!(JobStatus::from("Completed"), JobStatus::Completed);
        assert_eq!(JobStatus::from("Failed"), JobStatus::Failed);
        assert_eq!(JobStatus::from("Running"), JobStatus::Running);
        assert_eq!(JobStatus::from("Queued"), JobStatus::Other("Queued".to_string()));
        assert!(!JobStatus::from("completed").is_completed());
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let json = serde_json::to_string(&JobStatus::Other("Finalizing".to_string())).unwrap();
        assert_eq!(json, "\"Finalizing\"");
        let status: JobStatus = serde_json::from_str("\"Failed\"").unwrap();
        assert!(status.is_failed());
    }

    #[test]
    fn test_input_path_lookup() {
        let mut job = JobRecord { display_name: "model_20231115120000_abc".to_string(), ..Default::default() };
        job.inputs.insert("training_data".to_string(), JobInput::with_path("azureml:train:1"));
        job.inputs.insert("epochs".to_string(), JobInput::default());

        assert_eq!(job.input_path("training_data"), Some("azureml:train:1"));
        assert_eq!(job.input_path("epochs"), None);
        assert_eq!(job.input_path("missing"), None);
    }
}
