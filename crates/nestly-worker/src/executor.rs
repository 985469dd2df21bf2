//! Routes scheduled runs to the handler registered for their job type.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use nestly_core::error::AppError;

/// A single firing of a scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    /// Correlates the start and finish log lines.
    pub id: Uuid,
    pub job_type: String,
    pub triggered_at: DateTime<Utc>,
}

impl JobRun {
    pub fn now(job_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            job_type: job_type.into(),
            triggered_at: Utc::now(),
        }
    }
}

/// Periodic maintenance work keyed by a stable job type string.
#[async_trait]
pub trait JobHandler: Send + Sync + fmt::Debug {
    fn job_type(&self) -> &str;

    /// Perform one run. The returned value is logged as the run summary.
    async fn execute(&self, run: &JobRun) -> Result<Option<Value>, JobExecutionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Retrying on the next trigger will not help.
    #[error("job cannot succeed: {0}")]
    Permanent(String),

    /// The next trigger may succeed.
    #[error("job failed, will retry on next trigger: {0}")]
    Transient(String),

    #[error(transparent)]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Handler table. Built once at startup, then shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct JobExecutor {
    handlers: BTreeMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler`, replacing any previous handler for the same type.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_owned();
        if self.handlers.insert(job_type.clone(), handler).is_some() {
            tracing::warn!(%job_type, "Replaced existing job handler");
        } else {
            tracing::info!(%job_type, "Job handler registered");
        }
    }

    pub async fn execute(&self, run: &JobRun) -> Result<Option<Value>, JobExecutionError> {
        let Some(handler) = self.handlers.get(&run.job_type) else {
            return Err(JobExecutionError::Permanent(format!(
                "unknown job type '{}'",
                run.job_type
            )));
        };

        tracing::debug!(run_id = %run.id, job_type = %run.job_type, "Running job");
        handler.execute(run).await
    }

    /// Fire `job_type` now and log the outcome. Errors never escape.
    pub async fn run(&self, job_type: &str) {
        let run = JobRun::now(job_type);
        let started = std::time::Instant::now();
        let result = self.execute(&run).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(summary) => tracing::info!(
                run_id = %run.id,
                job_type,
                elapsed_ms,
                summary = %summary.unwrap_or(serde_json::Value::Null),
                "Job finished"
            ),
            Err(e) => tracing::error!(
                run_id = %run.id,
                job_type,
                elapsed_ms,
                retryable = e.is_transient(),
                error = %e,
                "Job failed"
            ),
        }
    }

    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered job types in lexical order.
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
