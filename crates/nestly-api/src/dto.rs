//! JSON bodies returned by the HTTP endpoints.

use serde::Serialize;

use nestly_database::PoolStats;
use nestly_realtime::{EventBusStats, RegistryStats};

/// `{"success": true, "data": ...}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Store reachability as seen by the detailed health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseHealth {
    /// In-memory store; nothing to ping.
    Memory,
    Connected,
    Unreachable,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    pub summary: HealthResponse,
    pub database: DatabaseHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
    pub connections: RegistryStats,
    pub event_bus: EventBusStats,
}
