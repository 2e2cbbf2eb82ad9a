//! Polls resubmitted training jobs until they resolve or the run times out.

use crate::clock::Clock;
use crate::config::RefreshSettings;
use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use drift_abstraction::{JobClient, JobRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct TrainingStatusRefresher {
    jobs: Arc<dyn JobClient>,
    clock: Arc<dyn Clock>,
    timeout_delay: Duration,
    refresh_delay: Duration,
}

impl TrainingStatusRefresher {
    #[must_use]
    pub fn new(jobs: Arc<dyn JobClient>, clock: Arc<dyn Clock>, settings: RefreshSettings) -> Self {
        Self { jobs, clock, timeout_delay: settings.timeout, refresh_delay: settings.delay }
    }

    #[must_use]
    pub fn timeout_delay(&self) -> Duration {
        self.timeout_delay
    }

    #[must_use]
    pub fn refresh_delay(&self) -> Duration {
        self.refresh_delay
    }

    /// Waits for `new_jobs` to finish and returns the ones that did not
    /// complete (i.e. failed).
    ///
    /// Completed jobs leave the tracked set as soon as they are seen. The loop
    /// ends once every tracked job is `Failed`, so a single running job keeps
    /// the whole batch waiting. The deadline is checked after every refresh
    /// and each iteration, the last one included, ends with a sleep.
    pub async fn wait_training(&self, new_jobs: Vec<JobRecord>) -> TrainingResult<Vec<JobRecord>> {
        let timeout = chrono::Duration::from_std(self.timeout_delay)
            .map_err(|e| TrainingError::Config(format!("refresh timeout out of range: {e}")))?;
        let deadline = self
            .clock
            .now()
            .checked_add_signed(timeout)
            .ok_or_else(|| TrainingError::Config(format!("refresh timeout out of range: {}s", timeout.num_seconds())))?;
        info!(
            timeout_secs = self.timeout_delay.as_secs(),
            deadline = %deadline,
            "Waiting for training jobs"
        );

        let mut updated_jobs = new_jobs;
        let mut has_to_wait = true;
        while has_to_wait {
            updated_jobs = self.refresh_job_status(&updated_jobs).await?;
            for job in &updated_jobs {
                info!(job = %job.display_name, "Wait for job to complete");
            }

            has_to_wait = updated_jobs.iter().any(|job| !job.status.is_failed());
            debug!(has_to_wait, remaining = updated_jobs.len(), "Refresh iteration done");

            self.check_timeout_reached(deadline)?;

            self.clock.sleep(self.refresh_delay).await;
        }

        Ok(updated_jobs)
    }

    pub fn check_timeout_reached(&self, deadline: DateTime<Utc>) -> TrainingResult<()> {
        if self.clock.now() > deadline {
            return Err(TrainingError::TimeoutReached { deadline });
        }
        Ok(())
    }

    /// Fetches each job once, in order, and keeps those not `Completed`.
    pub async fn refresh_job_status(&self, jobs: &[JobRecord]) -> TrainingResult<Vec<JobRecord>> {
        let mut refreshed_jobs = Vec::with_capacity(jobs.len());
        for job in jobs {
            let name = job
                .name
                .as_deref()
                .ok_or_else(|| TrainingError::MissingJobName(job.display_name.clone()))?;
            let refreshed = self.jobs.get_job(name).await?;
            info!(job = %refreshed.label(), status = %refreshed.status, "Training job status");

            if !refreshed.status.is_completed() {
                debug!(job = %refreshed.label(), "Add to waiting list");
                refreshed_jobs.push(refreshed);
            }
        }
        Ok(refreshed_jobs)
    }
}
