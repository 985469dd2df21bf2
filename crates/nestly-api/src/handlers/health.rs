//! Liveness and readiness endpoints.

use axum::Json;
use axum::extract::State;

use crate::dto::{ApiResponse, DatabaseHealth, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

fn summary(state: &AppState, degraded: bool) -> HealthResponse {
    HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(summary(&state, false)))
}

/// `GET /api/health/detailed`: store ping plus registry and bus counters.
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let (database, pool) = match &state.db_pool {
        None => (DatabaseHealth::Memory, None),
        Some(pool) => {
            let reachable = pool.ping().await;
            let health = if reachable {
                DatabaseHealth::Connected
            } else {
                DatabaseHealth::Unreachable
            };
            (health, Some(pool.stats()))
        }
    };

    Json(ApiResponse::ok(DetailedHealthResponse {
        summary: summary(&state, database == DatabaseHealth::Unreachable),
        database,
        pool,
        connections: state.engine.registry.stats(),
        event_bus: state.engine.bus.stats(),
    }))
}
