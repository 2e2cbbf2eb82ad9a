//! Retraining orchestration: find the newest in-scope job of every model
//! group, resubmit it against a new data asset version and wait for the
//! resubmitted jobs.

use crate::clock::Clock;
use crate::config::{DataAssetRef, RetrainingSettings};
use crate::error::{TrainingError, TrainingResult};
use crate::retraining::job_group::JobGroup;
use crate::retraining::refresher::TrainingStatusRefresher;
use crate::retraining::scope::ScopeFilter;
use chrono::{DateTime, Utc};
use drift_abstraction::{JobClient, JobRecord};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

const DISPLAY_NAME_SUFFIX_LEN: usize = 6;

/// `<group_name>_<YYYYMMDDHHMMSS>_<6 random alphanumerics>`.
#[must_use]
pub fn create_new_display_name(group_name: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DISPLAY_NAME_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}_{}_{}", group_name, now.format("%Y%m%d%H%M%S"), suffix)
}

/// Keeps the job with the greatest training timestamp of every group.
///
/// The first job seen for a group is kept; a later one replaces it only when
/// strictly newer. Groups come back ordered by name.
pub fn select_latest_per_group(jobs: Vec<JobRecord>) -> TrainingResult<Vec<JobGroup>> {
    let mut groups: BTreeMap<String, JobGroup> = BTreeMap::new();

    for job in jobs {
        let candidate = JobGroup::from_job(job)?;
        match groups.get(&candidate.group_name) {
            None => {
                info!(
                    job = %candidate.job.display_name,
                    trained_at = %candidate.training_timestamp,
                    group = %candidate.group_name,
                    "Add new job to group"
                );
                groups.insert(candidate.group_name.clone(), candidate);
            }
            Some(kept) if kept.is_older_than(candidate.training_timestamp) => {
                info!(
                    job = %candidate.job.display_name,
                    trained_at = %candidate.training_timestamp,
                    group = %candidate.group_name,
                    "Update group with newer job"
                );
                groups.insert(candidate.group_name.clone(), candidate);
            }
            Some(_) => {}
        }
    }

    Ok(groups.into_values().collect())
}

pub struct ModelRetrainer {
    jobs: Arc<dyn JobClient>,
    clock: Arc<dyn Clock>,
    scope: ScopeFilter,
    refresher: TrainingStatusRefresher,
}

impl ModelRetrainer {
    pub fn new(jobs: Arc<dyn JobClient>, clock: Arc<dyn Clock>, settings: &RetrainingSettings) -> TrainingResult<Self> {
        let scope = ScopeFilter::new(settings.model_name_prefix.as_deref(), settings.data_assets.clone())?;
        let refresher = TrainingStatusRefresher::new(jobs.clone(), clock.clone(), settings.refresh);
        Ok(Self { jobs, clock, scope, refresher })
    }

    #[must_use]
    pub fn job_name_pattern(&self) -> &str {
        self.scope.pattern()
    }

    #[must_use]
    pub fn data_assets(&self) -> &[DataAssetRef] {
        self.scope.data_assets()
    }

    #[must_use]
    pub fn is_in_scope(&self, job: &JobRecord) -> bool {
        self.scope.is_in_scope(job)
    }

    /// Retrains every model group and fails unless all resubmitted jobs complete.
    pub async fn run(&self, data_asset_version: &str) -> TrainingResult<()> {
        let jobs_to_retrain = self.retrieve_jobs_to_retrain().await?;
        let created_jobs = self.retrain_models(&jobs_to_retrain, data_asset_version).await?;
        self.check_success(created_jobs).await
    }

    pub async fn retrieve_jobs_to_retrain(&self) -> TrainingResult<Vec<JobGroup>> {
        let jobs = self.jobs.list_jobs().await?;
        debug!(count = jobs.len(), "Retrieved jobs");

        let in_scope: Vec<JobRecord> = jobs.into_iter().filter(|job| self.is_in_scope(job)).collect();
        debug!(count = in_scope.len(), pattern = %self.job_name_pattern(), "Retrieved jobs in scope");

        if in_scope.is_empty() {
            info!("No jobs to retrain.");
            return Err(TrainingError::NoEligibleJobs);
        }

        let jobs_to_retrain = select_latest_per_group(in_scope)?;
        for group in &jobs_to_retrain {
            debug!(group = %group, "Selected for retraining");
        }
        Ok(jobs_to_retrain)
    }

    /// Submits one new job per group and returns the records the platform
    /// created.
    pub async fn retrain_models(
        &self,
        jobs_to_retrain: &[JobGroup],
        data_asset_version: &str,
    ) -> TrainingResult<Vec<JobRecord>> {
        info!(version = %data_asset_version, "Retrain models with data asset version");

        let mut created_jobs = Vec::with_capacity(jobs_to_retrain.len());
        for group_job in jobs_to_retrain {
            info!(group = %group_job.group_name, "Retrain model for group");
            for data_asset in self.data_assets() {
                info!(
                    data_asset = %data_asset.name,
                    based_job = %group_job.job.display_name,
                    "Update data asset for based job"
                );
            }

            let display_name = create_new_display_name(&group_job.group_name, self.clock.now());
            let submission = group_job.resubmission(self.data_assets(), data_asset_version, display_name);
            let created_job = self.jobs.create_or_update_job(&submission).await?;

            info!(job = %created_job.label(), "Created job");
            debug!(job = ?created_job, "Created job record");
            created_jobs.push(created_job);
        }

        Ok(created_jobs)
    }

    pub async fn check_success(&self, jobs: Vec<JobRecord>) -> TrainingResult<()> {
        let failed_jobs = self.refresher.wait_training(jobs).await?;
        if failed_jobs.is_empty() {
            return Ok(());
        }

        for failed_job in &failed_jobs {
            error!(job = %failed_job.display_name, "Job failed.");
        }
        Err(TrainingError::JobsFailed(failed_jobs.into_iter().map(|job| job.display_name).collect()))
    }
}
