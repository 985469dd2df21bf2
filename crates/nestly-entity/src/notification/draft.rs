//! Producer-supplied notification drafts.

use serde::{Deserialize, Serialize};
use validator::Validate;

use nestly_core::types::id::{GroupId, UserId};
use nestly_core::{AppError, AppResult};

use super::kind::NotificationType;
use super::priority::NotificationPriority;

/// Everything a producer supplies to create a notification.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewNotification {
    /// Who receives it.
    pub recipient_id: UserId,
    /// Group context, if any.
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Notification type.
    pub notification_type: NotificationType,
    /// Short title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Body text.
    #[validate(length(min = 1, max = 1000))]
    pub message: String,
    /// Opaque producer payload (actor, related ids, amounts, action url).
    #[serde(default)]
    pub data: serde_json::Value,
    /// Advisory priority.
    #[serde(default)]
    pub priority: NotificationPriority,
}

impl NewNotification {
    /// Start a draft with normal priority and empty data.
    pub fn new(
        recipient_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id,
            group_id: None,
            notification_type,
            title: title.into(),
            message: message.into(),
            data: serde_json::Value::Object(serde_json::Map::new()),
            priority: NotificationPriority::Normal,
        }
    }

    /// Attach a group.
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Attach the producer payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Override the priority.
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Check field bounds and that the recipient is a real user id.
    pub fn check(&self) -> AppResult<()> {
        if self.recipient_id.is_nil() {
            return Err(AppError::validation("Recipient is required"));
        }
        self.validate()
            .map_err(|e| AppError::validation(format!("Invalid notification: {e}")))
    }
}
