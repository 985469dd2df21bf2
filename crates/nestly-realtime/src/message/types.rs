//! Outbound WebSocket message definitions.
//!
//! Serialized adjacently tagged, so each message becomes
//! `{"event": "<name>", "data": {...}}` inside its envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nestly_core::types::id::{ExpenseId, GroupId, NotificationId, TaskId, UserId};
use nestly_entity::notification::Notification;

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundMessage {
    /// Sent once to a freshly registered session.
    #[serde(rename = "connection:status")]
    ConnectionStatus {
        /// Always `true` on connect.
        connected: bool,
        /// The authenticated user.
        user_id: UserId,
        /// The user's group room, if any.
        group_id: Option<GroupId>,
        /// Server clock at connect time.
        server_time: DateTime<Utc>,
    },
    /// A new notification for the recipient.
    #[serde(rename = "notification:new")]
    NotificationNew(Box<Notification>),
    /// Echo of a read transition.
    #[serde(rename = "notification:read")]
    NotificationRead {
        /// The notification.
        notification_id: NotificationId,
        /// When it was read.
        read_at: DateTime<Utc>,
    },
    /// Echo of a bulk read.
    #[serde(rename = "notification:all_read")]
    NotificationAllRead {
        /// How many were marked.
        count: u64,
        /// Group scope, if any.
        group_id: Option<GroupId>,
    },
    /// Echo of a deletion.
    #[serde(rename = "notification:deleted")]
    NotificationDeleted {
        /// The removed notification.
        notification_id: NotificationId,
    },
    /// Echo of a snooze.
    #[serde(rename = "notification:snoozed")]
    NotificationSnoozed {
        /// The notification.
        notification_id: NotificationId,
        /// When it becomes active again.
        snoozed_until: DateTime<Utc>,
    },
    /// Activity feed item broadcast to a group room.
    #[serde(rename = "group_activity")]
    GroupActivity(GroupActivity),
    /// A member came online.
    #[serde(rename = "user:online")]
    UserOnline {
        /// The member.
        user_id: UserId,
        /// Their group.
        group_id: Option<GroupId>,
        /// Display name, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
    /// A member's last session closed.
    #[serde(rename = "user:offline")]
    UserOffline {
        /// The member.
        user_id: UserId,
        /// Their group.
        group_id: Option<GroupId>,
    },
    /// Error report.
    #[serde(rename = "error")]
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl OutboundMessage {
    /// Wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ConnectionStatus { .. } => "connection:status",
            Self::NotificationNew(_) => "notification:new",
            Self::NotificationRead { .. } => "notification:read",
            Self::NotificationAllRead { .. } => "notification:all_read",
            Self::NotificationDeleted { .. } => "notification:deleted",
            Self::NotificationSnoozed { .. } => "notification:snoozed",
            Self::GroupActivity(_) => "group_activity",
            Self::UserOnline { .. } => "user:online",
            Self::UserOffline { .. } => "user:offline",
            Self::Error { .. } => "error",
        }
    }
}

/// Who performed a group activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityActor {
    /// Actor id.
    pub id: UserId,
    /// Display name.
    pub name: String,
}

/// Feed item for `group_activity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupActivity {
    /// Activity type, e.g. `task_completed`.
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Human-readable line.
    pub message: String,
    /// Who did it.
    pub actor: ActivityActor,
    /// Related task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Related expense.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_id: Option<ExpenseId>,
    /// Related member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}
