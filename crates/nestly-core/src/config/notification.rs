//! Notification store configuration.

use serde::{Deserialize, Serialize};

/// Persistence backend for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL via sqlx.
    Postgres,
    /// Process-local store, for development and tests.
    Memory,
}

/// Notification persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Which store backs the notification record.
    #[serde(default = "default_store")]
    pub store: StoreBackend,
    /// Days a notification is retained before it expires.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            retention_days: default_retention_days(),
        }
    }
}

impl NotificationConfig {
    /// Retention window as a chrono duration.
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }
}

fn default_store() -> StoreBackend {
    StoreBackend::Memory
}

fn default_retention_days() -> u32 {
    30
}
