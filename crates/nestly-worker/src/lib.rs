//! Scheduled maintenance for Nestly notifications.
//!
//! This crate provides:
//! - A job executor that dispatches runs to the correct handler
//! - A cron scheduler that triggers handlers on their configured schedule
//! - The snooze sweep and retention purge jobs

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler, JobRun};
pub use scheduler::CronScheduler;
