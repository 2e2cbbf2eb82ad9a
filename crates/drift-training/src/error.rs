use chrono::{DateTime, Utc};
use drift_abstraction::PlatformError;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("No jobs in scope to retrain.")]
    NoEligibleJobs,

    #[error("Timeout reached: deadline was {deadline}")]
    TimeoutReached { deadline: DateTime<Utc> },

    #[error("Some jobs failed: {}", .0.join(", "))]
    JobsFailed(Vec<String>),

    #[error("job {0} has no platform identifier")]
    MissingJobName(String),

    #[error("malformed job display name: {0}")]
    MalformedJobName(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_failed_lists_display_names() {
        let err = TrainingError::JobsFailed(vec!["a_1_x".to_string(), "b_2_y".to_string()]);
        let msg = err.to_string();
        assert!(msg.starts_with("Some jobs failed"));
        assert!(msg.contains("a_1_x, b_2_y"));
    }

    #[test]
    fn test_platform_error_is_transparent() {
        let err: TrainingError = PlatformError::Secret("scope missing".to_string()).into();
        assert_eq!(err.to_string(), "Secret Error: scope missing");
    }
}
