//! Notification maintenance jobs: snooze sweep and retention purge.

use async_trait::async_trait;
use serde_json::Value;

use nestly_service::NotificationService;

use crate::executor::{JobExecutionError, JobHandler, JobRun};

/// Reactivates notifications whose snooze has elapsed.
#[derive(Debug)]
pub struct SnoozeSweepJob {
    service: NotificationService,
}

impl SnoozeSweepJob {
    /// Handler key.
    pub const JOB_TYPE: &'static str = "notification.snooze_sweep";

    /// Create a new snooze sweep job
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobHandler for SnoozeSweepJob {
    fn job_type(&self) -> &str {
        Self::JOB_TYPE
    }

    async fn execute(&self, _run: &JobRun) -> Result<Option<Value>, JobExecutionError> {
        let cleared = self.service.sweep_expired_snoozes().await.map_err(|e| {
            JobExecutionError::Transient(format!("Snooze sweep failed: {e}"))
        })?;

        tracing::debug!(cleared, "Snooze sweep finished");
        Ok(Some(serde_json::json!({ "cleared": cleared })))
    }
}

/// Deletes notifications past their retention window.
#[derive(Debug)]
pub struct RetentionPurgeJob {
    service: NotificationService,
}

impl RetentionPurgeJob {
    /// Handler key.
    pub const JOB_TYPE: &'static str = "notification.retention_purge";

    /// Create a new retention purge job
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobHandler for RetentionPurgeJob {
    fn job_type(&self) -> &str {
        Self::JOB_TYPE
    }

    async fn execute(&self, _run: &JobRun) -> Result<Option<Value>, JobExecutionError> {
        let purged = self.service.purge_expired().await.map_err(|e| {
            JobExecutionError::Transient(format!("Retention purge failed: {e}"))
        })?;

        Ok(Some(serde_json::json!({ "purged": purged })))
    }
}
