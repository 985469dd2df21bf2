//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use nestly_core::config::AppConfig;
use nestly_database::DatabasePool;
use nestly_database::store::GroupDirectory;
use nestly_realtime::RealtimeEngine;

/// Application state passed to every handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// PostgreSQL pool, absent when running on the in-memory store
    pub db_pool: Option<DatabasePool>,
    /// Group membership lookup used at connect time
    pub groups: Arc<dyn GroupDirectory>,

    // ── Realtime ─────────────────────────────────────────────
    /// Event bus and connection registry
    pub engine: RealtimeEngine,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        config: Arc<AppConfig>,
        db_pool: Option<DatabasePool>,
        groups: Arc<dyn GroupDirectory>,
        engine: RealtimeEngine,
    ) -> Self {
        Self {
            config,
            db_pool,
            groups,
            engine,
            started_at: Instant::now(),
        }
    }
}
