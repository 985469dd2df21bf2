//! # nestly-api
//!
//! HTTP surface for Nestly notifications built on Axum: the `/ws`
//! WebSocket gateway that feeds the connection registry, and health
//! endpoints. Request authentication happens upstream; the gateway reads
//! the identity from an [`AuthenticatedUser`] request extension.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use extractors::AuthenticatedUser;
pub use router::build_router;
pub use state::AppState;
