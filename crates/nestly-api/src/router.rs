//! Route definitions.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the router: `/ws` plus `/api/health*`, with request tracing.
///
/// Authentication is layered on by the caller; without an
/// [`AuthenticatedUser`](crate::AuthenticatedUser) extension `/ws`
/// answers 401.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
