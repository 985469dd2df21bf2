//! Internal notification lifecycle events for secondary consumers.

use serde::{Deserialize, Serialize};

use crate::types::id::{GroupId, NotificationId, UserId};

/// Events emitted after the notification record changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A notification was persisted.
    Created {
        /// The new notification.
        notification_id: NotificationId,
        /// Its recipient.
        recipient_id: UserId,
        /// Its group, if any.
        group_id: Option<GroupId>,
        /// Notification type identifier (e.g. `TASK_ASSIGNED`).
        notification_type: String,
        /// Whether the realtime push reached a live session.
        delivered_realtime: bool,
    },
}

impl NotificationEvent {
    /// The group concerned, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Created { group_id, .. } => *group_id,
        }
    }
}
