//! Model groups parsed from training job display names.

use crate::config::DataAssetRef;
use crate::error::{TrainingError, TrainingResult};
use drift_abstraction::{JobInput, JobRecord};
use std::fmt;
use std::str::FromStr;

/// `YYYYMMDDHHMMSS` token of a job display name, compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrainingTimestamp(u64);

impl TrainingTimestamp {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for TrainingTimestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for TrainingTimestamp {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TrainingError::MalformedJobName(format!("invalid training timestamp {s:?}")));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| TrainingError::MalformedJobName(format!("invalid training timestamp {s:?}: {e}")))
    }
}

impl fmt::Display for TrainingTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:014}", self.0)
    }
}

/// The job currently retained for a model group.
#[derive(Debug, Clone, PartialEq)]
pub struct JobGroup {
    pub group_name: String,
    pub training_timestamp: TrainingTimestamp,
    pub job: JobRecord,
}

impl JobGroup {
    #[must_use]
    pub fn new(group_name: String, training_timestamp: TrainingTimestamp, job: JobRecord) -> Self {
        Self { group_name, training_timestamp, job }
    }

    /// Builds a group from `<group>_<timestamp>_...` display names.
    pub fn from_job(job: JobRecord) -> TrainingResult<Self> {
        let mut tokens = job.display_name.split('_');
        let (Some(group_name), Some(timestamp)) = (tokens.next(), tokens.next()) else {
            return Err(TrainingError::MalformedJobName(job.display_name.clone()));
        };
        let training_timestamp = timestamp.parse::<TrainingTimestamp>()?;
        Ok(Self::new(group_name.to_string(), training_timestamp, job))
    }

    #[must_use]
    pub fn is_older_than(&self, other_training_timestamp: TrainingTimestamp) -> bool {
        self.training_timestamp < other_training_timestamp
    }

    /// A new submission derived from the retained job: every monitored input
    /// points at `<asset>:<data_asset_version>`, the platform identifier is
    /// cleared and the display name replaced. The retained job is untouched.
    #[must_use]
    pub fn resubmission(
        &self,
        data_assets: &[DataAssetRef],
        data_asset_version: &str,
        display_name: String,
    ) -> JobRecord {
        let mut inputs = self.job.inputs.clone();
        for data_asset in data_assets {
            let path = format!("{}:{}", data_asset.value, data_asset_version);
            inputs
                .entry(data_asset.name.clone())
                .and_modify(|input| input.path = Some(path.clone()))
                .or_insert_with(|| JobInput::with_path(path));
        }

        JobRecord {
            name: None,
            display_name,
            status: self.job.status.clone(),
            inputs,
            properties: self.job.properties.clone(),
        }
    }
}

impl fmt::Display for JobGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JobGroup(group_name={}, training_timestamp={}, job={})",
            self.group_name,
            self.training_timestamp,
            self.job.label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(display_name: &str) -> JobRecord {
        let mut job = JobRecord {
            name: Some("sharp_apple_1".to_string()),
            display_name: display_name.to_string(),
            ..Default::default()
        };
        let mut input = JobInput::with_path("azureml:train:1");
        input.extra.insert("mode".to_string(), serde_json::json!("ro_mount"));
        job.inputs.insert("training_data".to_string(), input);
        job.inputs.insert("learning_rate".to_string(), JobInput::default());
        job.properties.insert("experimentName".to_string(), serde_json::json!("sales"));
        job
    }

    #[test]
    fn test_from_job_splits_display_name() {
        let group = JobGroup::from_job(job("model_20231115120000_abc")).unwrap();
        assert_eq!(group.group_name, "model");
        assert_eq!(group.training_timestamp.to_string(), "20231115120000");
        assert_eq!(group.training_timestamp.value(), 20_231_115_120_000);
    }

    #[test]
    fn test_from_job_rejects_missing_timestamp() {
        assert!(matches!(JobGroup::from_job(job("model")), Err(TrainingError::MalformedJobName(_))));
        assert!(JobGroup::from_job(job("model_latest_abc")).is_err());
    }

    #[test]
    fn test_is_older_than() {
        let group = JobGroup::from_job(job("model_20231115120000_abc")).unwrap();
        assert!(group.is_older_than(TrainingTimestamp::from(20_231_115_130_000)));
        assert!(!group.is_older_than(TrainingTimestamp::from(20_231_115_120_000)));
        assert!(!group.is_older_than(TrainingTimestamp::from(20_231_115_110_000)));
    }

    #[test]
    fn test_timestamp_compares_numerically() {
        let narrow: TrainingTimestamp = "999".parse().unwrap();
        let wide: TrainingTimestamp = "1000".parse().unwrap();
        assert!(narrow < wide);
        assert_eq!(TrainingTimestamp::from(5).to_string(), "00000000000005");
    }

    #[test]
    fn test_resubmission_leaves_template_untouched() {
        let group = JobGroup::from_job(job("model_20231115120000_abc")).unwrap();
        let assets = vec![DataAssetRef::new("training_data", "azureml:train")];

        let submission = group.resubmission(&assets, "20240101000000", "model_20240101000000_Zx9aB1".to_string());

        assert_eq!(submission.name, None);
        assert_eq!(submission.display_name, "model_20240101000000_Zx9aB1");
        assert_eq!(submission.input_path("training_data"), Some("azureml:train:20240101000000"));
        assert_eq!(submission.inputs["training_data"].extra["mode"], serde_json::json!("ro_mount"));
        assert!(submission.inputs.contains_key("learning_rate"));
        assert_eq!(submission.properties["experimentName"], serde_json::json!("sales"));

        assert_eq!(group.job.name.as_deref(), Some("sharp_apple_1"));
        assert_eq!(group.job.input_path("training_data"), Some("azureml:train:1"));
    }
}
