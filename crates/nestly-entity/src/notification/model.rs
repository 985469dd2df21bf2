//! Notification entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use nestly_core::types::id::{GroupId, NotificationId, UserId};

use super::delivery::DeliveryStatus;
use super::draft::NewNotification;
use super::kind::NotificationType;
use super::priority::NotificationPriority;

/// A durable notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user. Never changes after creation.
    pub recipient_id: UserId,
    /// Group context, if any.
    pub group_id: Option<GroupId>,
    /// Notification type.
    pub notification_type: NotificationType,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Opaque producer payload.
    pub data: serde_json::Value,
    /// Advisory priority.
    pub priority: NotificationPriority,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// When it was read; set exactly once.
    pub read_at: Option<DateTime<Utc>>,
    /// Per-channel delivery outcomes.
    pub delivery_status: DeliveryStatus,
    /// Whether the notification is snoozed.
    pub is_snoozed: bool,
    /// When the snooze ends.
    pub snoozed_until: Option<DateTime<Utc>>,
    /// How many times it has been snoozed.
    pub snooze_count: i32,
    /// Reserved batching flag.
    pub is_batched: bool,
    /// Reserved batch size.
    pub batch_count: i32,
    /// Reserved batch members.
    pub batched_notifications: Vec<NotificationId>,
    /// Reserved batch parent.
    pub batch_parent: Option<NotificationId>,
    /// First click time.
    pub clicked_at: Option<DateTime<Utc>>,
    /// First dismiss time.
    pub dismissed_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// After this instant the record is never returned and may be purged.
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    /// Build a fresh record from a draft.
    pub fn from_draft(draft: NewNotification, now: DateTime<Utc>, retention: Duration) -> Self {
        Self {
            id: NotificationId::new(),
            recipient_id: draft.recipient_id,
            group_id: draft.group_id,
            notification_type: draft.notification_type,
            title: draft.title,
            message: draft.message,
            data: draft.data,
            priority: draft.priority,
            is_read: false,
            read_at: None,
            delivery_status: DeliveryStatus::default(),
            is_snoozed: false,
            snoozed_until: None,
            snooze_count: 0,
            is_batched: false,
            batch_count: 0,
            batched_notifications: Vec::new(),
            batch_parent: None,
            clicked_at: None,
            dismissed_at: None,
            created_at: now,
            expires_at: now + retention,
        }
    }

    /// Whether the record is past its retention window.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Not snoozed, or the snooze has elapsed.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_snoozed || self.snoozed_until.is_none_or(|until| until <= now)
    }

    /// Whether the recipient dismissed it.
    pub fn is_dismissed(&self) -> bool {
        self.dismissed_at.is_some()
    }

    /// Whether `user` owns this notification.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.recipient_id == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notification {
        let draft = NewNotification::new(
            UserId::new(),
            NotificationType::TaskAssigned,
            "Dishes",
            "You have a new task",
        );
        Notification::from_draft(draft, Utc::now(), Duration::days(30))
    }

    #[test]
    fn test_from_draft_defaults() {
        let n = sample();
        assert!(!n.is_read);
        assert!(n.read_at.is_none());
        assert_eq!(n.expires_at - n.created_at, Duration::days(30));
        assert!(!n.delivery_status.realtime.delivered);
    }

    #[test]
    fn test_is_active() {
        let now = Utc::now();
        let mut n = sample();
        assert!(n.is_active(now));

        n.is_snoozed = true;
        n.snoozed_until = Some(now + Duration::hours(1));
        assert!(!n.is_active(now));

        n.snoozed_until = Some(now - Duration::milliseconds(1));
        assert!(n.is_active(now));
    }

    #[test]
    fn test_is_expired() {
        let n = sample();
        assert!(!n.is_expired(n.created_at));
        assert!(n.is_expired(n.expires_at));
    }
}
