//! Cron triggers for the notification maintenance jobs.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler, JobSchedulerError};

use nestly_core::config::WorkerConfig;
use nestly_core::error::AppError;

use crate::executor::JobExecutor;
use crate::jobs::{RetentionPurgeJob, SnoozeSweepJob};

fn scheduler_error(action: &str, err: JobSchedulerError) -> AppError {
    AppError::internal(format!("scheduler could not {action}: {err}"))
}

/// Fires [`JobExecutor::run`] on six-field cron expressions
/// (`sec min hour day month weekday`).
pub struct CronScheduler {
    inner: JobScheduler,
    executor: Arc<JobExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("job_types", &self.executor.registered_types())
            .finish_non_exhaustive()
    }
}

impl CronScheduler {
    pub async fn new(executor: Arc<JobExecutor>) -> Result<Self, AppError> {
        let inner = JobScheduler::new()
            .await
            .map_err(|e| scheduler_error("be created", e))?;
        Ok(Self { inner, executor })
    }

    /// Snooze sweep and retention purge on the configured schedules.
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> Result<(), AppError> {
        for (job_type, schedule) in [
            (SnoozeSweepJob::JOB_TYPE, config.snooze_sweep_cron.as_str()),
            (RetentionPurgeJob::JOB_TYPE, config.retention_purge_cron.as_str()),
        ] {
            self.register(job_type, schedule).await?;
        }
        Ok(())
    }

    pub async fn register(&self, job_type: &str, schedule: &str) -> Result<(), AppError> {
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "cannot schedule '{job_type}': no handler registered"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let key: Arc<str> = Arc::from(job_type);
        let job = CronJob::new_async(schedule, move |_id, _scheduler| {
            let executor = Arc::clone(&executor);
            let key = Arc::clone(&key);
            Box::pin(async move { executor.run(&key).await })
        })
        .map_err(|e| {
            AppError::configuration(format!("bad cron expression '{schedule}' for {job_type}: {e}"))
        })?;

        self.inner
            .add(job)
            .await
            .map_err(|e| scheduler_error("add a job", e))?;

        tracing::info!(job_type, schedule, "Job scheduled");
        Ok(())
    }

    pub async fn start(&self) -> Result<(), AppError> {
        self.inner
            .start()
            .await
            .map_err(|e| scheduler_error("start", e))?;
        tracing::info!(jobs = ?self.executor.registered_types(), "Scheduler running");
        Ok(())
    }

    /// Stop firing triggers. Runs already in progress are not awaited.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        // `JobScheduler` is a cheap handle; shutdown needs `&mut`.
        let mut inner = self.inner.clone();
        inner
            .shutdown()
            .await
            .map_err(|e| scheduler_error("shut down", e))?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
