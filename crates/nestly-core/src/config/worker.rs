//! Maintenance worker configuration.

use serde::{Deserialize, Serialize};

/// Scheduled maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether scheduled maintenance runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds) for the snooze sweep.
    #[serde(default = "default_snooze_sweep_cron")]
    pub snooze_sweep_cron: String,
    /// Cron expression (with seconds) for the retention purge.
    #[serde(default = "default_retention_purge_cron")]
    pub retention_purge_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snooze_sweep_cron: default_snooze_sweep_cron(),
            retention_purge_cron: default_retention_purge_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_snooze_sweep_cron() -> String {
    "0 * * * * *".to_string()
}

fn default_retention_purge_cron() -> String {
    "0 0 2 * * *".to_string()
}
