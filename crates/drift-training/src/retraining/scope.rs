//! Decides which historical jobs are eligible for retraining.

use crate::config::DataAssetRef;
use crate::error::{TrainingError, TrainingResult};
use drift_abstraction::JobRecord;
use regex::Regex;
use tracing::{debug, info};

/// Group names accepted when no prefix allow-list is configured.
pub const DEFAULT_GROUP_PATTERN: &str = "[a-z,0-9]{2,}";

/// Builds `^<group-pattern>_[0-9]{14}_.*$`.
///
/// A comma separated prefix list becomes an alternation, inserted verbatim:
/// prefixes must already be lowercase to match display names.
#[must_use]
pub fn job_name_pattern(model_name_prefix: Option<&str>) -> String {
    let group_name_pattern = match model_name_prefix {
        Some(prefix) => {
            let alternation = prefix.replace(',', "|");
            info!(prefixes = %alternation, "Retrain models for listed prefixes only");
            format!("({alternation})")
        }
        None => DEFAULT_GROUP_PATTERN.to_string(),
    };
    format!("^{group_name_pattern}_[0-9]{{14}}_.*$")
}

/// True when the job declares `data_asset_name` and its path starts with
/// `data_asset`. Plain string prefix, the version suffix is not inspected.
#[must_use]
pub fn is_data_asset_in_scope(job: &JobRecord, data_asset_name: &str, data_asset: &str) -> bool {
    job.input_path(data_asset_name).is_some_and(|path| path.starts_with(data_asset))
}

#[derive(Debug, Clone)]
pub struct ScopeFilter {
    pattern: Regex,
    data_assets: Vec<DataAssetRef>,
}

impl ScopeFilter {
    pub fn new(model_name_prefix: Option<&str>, data_assets: Vec<DataAssetRef>) -> TrainingResult<Self> {
        let pattern = job_name_pattern(model_name_prefix);
        let pattern = Regex::new(&pattern)
            .map_err(|e| TrainingError::Config(format!("invalid job name pattern {pattern}: {e}")))?;
        Ok(Self { pattern, data_assets })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn data_assets(&self) -> &[DataAssetRef] {
        &self.data_assets
    }

    #[must_use]
    pub fn are_data_assets_in_scope(&self, job: &JobRecord) -> bool {
        self.data_assets
            .iter()
            .all(|asset| is_data_asset_in_scope(job, &asset.name, &asset.value))
    }

    #[must_use]
    pub fn is_in_scope(&self, job: &JobRecord) -> bool {
        if !self.pattern.is_match(&job.display_name) {
            return false;
        }
        let in_scope = self.are_data_assets_in_scope(job);
        if !in_scope {
            debug!(job = %job.label(), "Job name matches but data assets are out of scope");
        }
        in_scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_abstraction::JobInput;

    const TRAIN: &str = "azureml://datastores/data/paths/train";
    const VAL: &str = "azureml://datastores/data/paths/val";

    fn assets() -> Vec<DataAssetRef> {
        vec![DataAssetRef::new("training_data", TRAIN), DataAssetRef::new("validation_data", VAL)]
    }

    fn job(display_name: &str, train_path: &str) -> JobRecord {
        let mut job = JobRecord { display_name: display_name.to_string(), ..Default::default() };
        job.inputs.insert("training_data".to_string(), JobInput::with_path(train_path));
        job.inputs.insert("validation_data".to_string(), JobInput::with_path(format!("{VAL}:v1")));
        job
    }

    #[test]
    fn test_default_pattern() {
        assert_eq!(job_name_pattern(None), r"^[a-z,0-9]{2,}_[0-9]{14}_.*$");
    }

    #[test]
    fn test_pattern_with_prefix_list() {
        assert_eq!(job_name_pattern(Some("modelA,modelB")), r"^(modelA|modelB)_[0-9]{14}_.*$");
    }

    #[test]
    fn test_matching_job_is_in_scope() {
        let filter = ScopeFilter::new(None, assets()).unwrap();
        assert!(filter.is_in_scope(&job("model_20231115120000_abc", &format!("{TRAIN}:v1"))));
    }

    #[test]
    fn test_without_data_assets_name_alone_decides() {
        let filter = ScopeFilter::new(None, Vec::new()).unwrap();
        let bare = JobRecord { display_name: "model_20231115120000_abc".to_string(), ..Default::default() };

        assert!(filter.is_in_scope(&bare));
        assert!(filter.is_in_scope(&job("model_20231115120000_abc", "azureml:elsewhere")));
        assert!(!filter.is_in_scope(&job("Model_20231115120000_abc", &format!("{TRAIN}:v1"))));
    }

    #[test]
    fn test_name_must_match_whole_pattern() {
        let filter = ScopeFilter::new(Some("model"), assets()).unwrap();
        let train = format!("{TRAIN}:v1");
        assert!(filter.is_in_scope(&job("model_20231115120000_abc", &train)));
        assert!(!filter.is_in_scope(&job("other_20231115120000_abc", &train)));
        assert!(!filter.is_in_scope(&job("Model_20231115120000_abc", &train)));
        assert!(!filter.is_in_scope(&job("model_2023111512000_abc", &train)));
        assert!(!filter.is_in_scope(&job("model_20231115120000", &train)));
        assert!(!filter.is_in_scope(&job("x_20231115120000_abc", &train)));
    }

    #[test]
    fn test_uppercase_prefix_never_matches_default_class() {
        let filter = ScopeFilter::new(None, assets()).unwrap();
        assert!(!filter.is_in_scope(&job("SALES_20231115120000_abc", &format!("{TRAIN}:v1"))));
    }

    #[test]
    fn test_wrong_asset_path_is_out_of_scope() {
        let filter = ScopeFilter::new(None, assets()).unwrap();
        assert!(!filter.is_in_scope(&job("model_20231115120000_abc", "azureml://wrong/path:v1")));
    }

    #[test]
    fn test_missing_input_is_out_of_scope() {
        let filter = ScopeFilter::new(None, assets()).unwrap();
        let mut candidate = job("model_20231115120000_abc", &format!("{TRAIN}:v1"));
        candidate.inputs.remove("validation_data");
        assert!(!filter.is_in_scope(&candidate));
    }

    #[test]
    fn test_literal_input_without_path_is_out_of_scope() {
        let filter = ScopeFilter::new(None, assets()).unwrap();
        let mut candidate = job("model_20231115120000_abc", &format!("{TRAIN}:v1"));
        candidate.inputs.insert("training_data".to_string(), JobInput::default());
        assert!(!filter.is_in_scope(&candidate));
    }

    #[test]
    fn test_prefix_check_is_not_segment_aware() {
        let filter = ScopeFilter::new(None, assets()).unwrap();
        assert!(filter.is_in_scope(&job("model_20231115120000_abc", &format!("{TRAIN}ing:v1"))));
    }

    #[test]
    fn test_invalid_prefix_is_config_error() {
        assert!(matches!(ScopeFilter::new(Some("model("), assets()), Err(TrainingError::Config(_))));
    }
}
