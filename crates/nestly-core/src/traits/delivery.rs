//! Outbound delivery provider contract (email, push).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A rendered message handed to a delivery provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Plain-text body.
    pub text_body: String,
}

/// Result of a single provider call.
///
/// Providers never return an error: transport failures are folded into
/// [`DeliveryOutcome::Failed`] so callers can record them per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Accepted by the provider.
    Sent {
        /// Provider-assigned message id.
        message_id: String,
    },
    /// Rejected or unreachable.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Whether the provider accepted the message.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    /// Provider message id, when sent.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Sent { message_id } => Some(message_id),
            Self::Failed { .. } => None,
        }
    }
}

/// Trait for outbound transports.
#[async_trait]
pub trait DeliveryProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Send one message.
    async fn send(&self, message: &EmailMessage) -> DeliveryOutcome;
}
