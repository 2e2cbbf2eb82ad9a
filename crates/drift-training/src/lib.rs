//! Drift Training
//!
//! Pipeline stages that keep models trained on fresh data:
//! - `register`: publish a new version of the training data assets
//! - `retrain`: resubmit the newest job of every model group against that
//!   version and wait for the resubmitted jobs

pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registration;
pub mod retraining;
pub mod signal;

#[cfg(test)]
mod fakes;

pub use clock::{Clock, SystemClock};
pub use config::{
    AzmlParameters, DataAssetRef, JobConfig, JobParameters, RefreshSettings, RegistrationParameters,
    RetrainingSettings,
};
pub use error::{TrainingError, TrainingResult};
pub use pipeline::{AdditionalArgs, Pipeline, Transformer};
pub use registration::{DataAssetRegistrator, DatasetRegistrator};
pub use retraining::{
    JobGroup, ModelRetrainer, RetrainStage, ScopeFilter, TrainingStatusRefresher, TrainingTimestamp,
};
pub use signal::{FileTaskValues, InMemoryTaskValues, TaskValues, DATA_ASSET_VERSION_KEY};
