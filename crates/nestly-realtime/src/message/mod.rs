//! Messages pushed to WebSocket clients.

pub mod envelope;
pub mod types;

pub use envelope::MessageEnvelope;
pub use types::{ActivityActor, GroupActivity, OutboundMessage};
