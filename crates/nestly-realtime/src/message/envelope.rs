//! Envelope framing every outbound message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::OutboundMessage;

/// Wire frame: `{"id", "event", "data", "delivered_at"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Unique message id.
    pub id: Uuid,
    /// Event name and payload.
    #[serde(flatten)]
    pub message: OutboundMessage,
    /// When the registry handed the message to the session.
    pub delivered_at: DateTime<Utc>,
}

impl MessageEnvelope {
    /// Wrap a message, stamping `delivered_at` now.
    pub fn new(message: OutboundMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            delivered_at: Utc::now(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
