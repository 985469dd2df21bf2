//! Persistence seams for the notification record and group membership.
//!
//! Every mutating method is a single conditional write keyed on
//! `(id, recipient)`: it returns the updated record only when the write
//! actually happened, so callers can tell "not yours / gone" from
//! "already in that state" without a read-modify-write race.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nestly_core::result::AppResult;
use nestly_core::types::id::{GroupId, NotificationId, UserId};
use nestly_core::types::pagination::{PageRequest, PageResponse};
use nestly_entity::notification::{ChannelDelivery, DeliveryChannel, Notification, NotificationType};

/// Filters for listing a recipient's notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    /// Page to return.
    #[serde(flatten)]
    pub page: PageRequest,
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Only this type.
    #[serde(default)]
    pub notification_type: Option<NotificationType>,
    /// Only this group.
    #[serde(default)]
    pub group_id: Option<GroupId>,
    /// Include notifications whose snooze has not elapsed yet.
    #[serde(default)]
    pub include_snoozed: bool,
}

impl NotificationQuery {
    /// Query for one page with no filters.
    pub fn page(page: u64, page_size: u64) -> Self {
        Self {
            page: PageRequest::new(page, page_size),
            ..Self::default()
        }
    }

    /// Restrict to unread notifications.
    pub fn unread(mut self) -> Self {
        self.unread_only = true;
        self
    }
}

/// The notification system of record.
///
/// Expired records (`expires_at <= now`) are invisible to every method
/// except [`NotificationStore::purge_expired`].
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new record.
    async fn insert(&self, notification: &Notification) -> AppResult<Notification>;

    /// Fetch one record.
    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Newest-first page of a recipient's notifications. Dismissed records
    /// are always excluded.
    async fn list(
        &self,
        recipient: UserId,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>>;

    /// Count a recipient's visible notifications.
    async fn count(
        &self,
        recipient: UserId,
        unread_only: bool,
        group_id: Option<GroupId>,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Flip `is_read` if owned and unread. `None` when nothing changed.
    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Mark every unread notification of the recipient (optionally within
    /// one group) as read. Returns how many changed.
    async fn mark_all_read(
        &self,
        recipient: UserId,
        group_id: Option<GroupId>,
        at: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Snooze until `until` and bump `snooze_count`.
    async fn snooze(
        &self,
        id: NotificationId,
        recipient: UserId,
        until: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Clear the snooze.
    async fn unsnooze(&self, id: NotificationId, recipient: UserId)
    -> AppResult<Option<Notification>>;

    /// Clear every snooze whose `snoozed_until` is at or before `now`.
    async fn sweep_expired_snoozes(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Record the first click.
    async fn mark_clicked(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Record the first dismissal.
    async fn mark_dismissed(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Remove an owned record. Returns whether a row was deleted.
    async fn delete(&self, id: NotificationId, recipient: UserId) -> AppResult<bool>;

    /// Overwrite one channel's delivery outcome.
    async fn set_channel_delivery(
        &self,
        id: NotificationId,
        channel: DeliveryChannel,
        outcome: &ChannelDelivery,
    ) -> AppResult<bool>;

    /// Physically delete expired records.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Read-only view of household membership.
#[async_trait]
pub trait GroupDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Current members of a group.
    async fn members(&self, group_id: GroupId) -> AppResult<Vec<UserId>>;

    /// The group a user belongs to, if any.
    async fn group_of(&self, user_id: UserId) -> AppResult<Option<GroupId>>;
}
