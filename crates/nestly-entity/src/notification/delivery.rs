//! Per-channel delivery bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    /// Live WebSocket push.
    Realtime,
    /// Mobile push.
    Push,
    /// Email.
    Email,
}

impl DeliveryChannel {
    /// Key used inside the stored `delivery_status` document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Push => "push",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDelivery {
    /// Whether the channel accepted the notification.
    pub delivered: bool,
    /// When the outcome was recorded.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Provider message id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl ChannelDelivery {
    /// A delivered outcome stamped at `at`.
    pub fn delivered(at: DateTime<Utc>, message_id: Option<String>) -> Self {
        Self {
            delivered: true,
            delivered_at: Some(at),
            message_id,
        }
    }

    /// A failed outcome stamped at `at`.
    pub fn failed(at: DateTime<Utc>) -> Self {
        Self {
            delivered: false,
            delivered_at: Some(at),
            message_id: None,
        }
    }
}

/// Independent outcomes for every channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Realtime push outcome.
    #[serde(default)]
    pub realtime: ChannelDelivery,
    /// Mobile push outcome.
    #[serde(default)]
    pub push: ChannelDelivery,
    /// Email outcome.
    #[serde(default)]
    pub email: ChannelDelivery,
}

impl DeliveryStatus {
    /// Borrow one channel's outcome.
    pub fn channel(&self, channel: DeliveryChannel) -> &ChannelDelivery {
        match channel {
            DeliveryChannel::Realtime => &self.realtime,
            DeliveryChannel::Push => &self.push,
            DeliveryChannel::Email => &self.email,
        }
    }

    /// Replace one channel's outcome, leaving the others untouched.
    pub fn set(&mut self, channel: DeliveryChannel, outcome: ChannelDelivery) {
        match channel {
            DeliveryChannel::Realtime => self.realtime = outcome,
            DeliveryChannel::Push => self.push = outcome,
            DeliveryChannel::Email => self.email = outcome,
        }
    }
}
