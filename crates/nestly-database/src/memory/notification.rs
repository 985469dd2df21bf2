//! In-memory notification store.
//!
//! Every mutation runs under one write lock, which gives the same
//! conditional-write guarantees as the SQL `UPDATE ... WHERE` statements.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use nestly_core::error::AppError;
use nestly_core::result::AppResult;
use nestly_core::types::id::{GroupId, NotificationId, UserId};
use nestly_core::types::pagination::PageResponse;
use nestly_entity::notification::{ChannelDelivery, DeliveryChannel, Notification};

use crate::store::{NotificationQuery, NotificationStore};

/// Notification store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    records: RwLock<HashMap<NotificationId, Notification>>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Apply `update` to an owned, unexpired record. Returns the updated
    /// record when `update` reports a change.
    async fn update_owned<F>(
        &self,
        id: NotificationId,
        recipient: UserId,
        now: DateTime<Utc>,
        update: F,
    ) -> Option<Notification>
    where
        F: FnOnce(&mut Notification) -> bool + Send,
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .filter(|n| n.is_owned_by(recipient) && !n.is_expired(now))?;
        update(record).then(|| record.clone())
    }
}

fn visible(n: &Notification, recipient: UserId, now: DateTime<Utc>) -> bool {
    n.is_owned_by(recipient) && !n.is_expired(now) && !n.is_dismissed()
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> AppResult<Notification> {
        let mut records = self.records.write().await;
        if records.contains_key(&notification.id) {
            return Err(AppError::conflict(format!(
                "Notification {} already exists",
                notification.id
            )));
        }
        records.insert(notification.id, notification.clone());
        Ok(notification.clone())
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let now = Utc::now();
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .filter(|n| !n.is_expired(now))
            .cloned())
    }

    async fn list(
        &self,
        recipient: UserId,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        let records = self.records.read().await;
        let mut matching: Vec<&Notification> = records
            .values()
            .filter(|n| visible(n, recipient, now))
            .filter(|n| !query.unread_only || !n.is_read)
            .filter(|n| query.notification_type.is_none_or(|t| n.notification_type == t))
            .filter(|n| query.group_id.is_none_or(|g| n.group_id == Some(g)))
            .filter(|n| query.include_snoozed || n.is_active(now))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .cloned()
            .collect();

        Ok(PageResponse::for_request(items, &query.page, total))
    }

    async fn count(
        &self,
        recipient: UserId,
        unread_only: bool,
        group_id: Option<GroupId>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let records = self.records.read().await;
        let total = records
            .values()
            .filter(|n| visible(n, recipient, now) && n.is_active(now))
            .filter(|n| !unread_only || !n.is_read)
            .filter(|n| group_id.is_none_or(|g| n.group_id == Some(g)))
            .count();
        Ok(total as u64)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .update_owned(id, recipient, at, |n| {
                if n.is_read {
                    return false;
                }
                n.is_read = true;
                n.read_at = Some(at);
                true
            })
            .await)
    }

    async fn mark_all_read(
        &self,
        recipient: UserId,
        group_id: Option<GroupId>,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let mut changed = 0;
        for n in records.values_mut() {
            if n.is_owned_by(recipient)
                && !n.is_read
                && !n.is_expired(at)
                && group_id.is_none_or(|g| n.group_id == Some(g))
            {
                n.is_read = true;
                n.read_at = Some(at);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn snooze(
        &self,
        id: NotificationId,
        recipient: UserId,
        until: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .update_owned(id, recipient, Utc::now(), |n| {
                n.is_snoozed = true;
                n.snoozed_until = Some(until);
                n.snooze_count += 1;
                true
            })
            .await)
    }

    async fn unsnooze(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .update_owned(id, recipient, Utc::now(), |n| {
                n.is_snoozed = false;
                n.snoozed_until = None;
                true
            })
            .await)
    }

    async fn sweep_expired_snoozes(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let mut cleared = 0;
        for n in records.values_mut() {
            if n.is_snoozed && n.snoozed_until.is_some_and(|until| until <= now) {
                n.is_snoozed = false;
                n.snoozed_until = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn mark_clicked(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .update_owned(id, recipient, at, |n| {
                n.clicked_at.get_or_insert(at);
                true
            })
            .await)
    }

    async fn mark_dismissed(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .update_owned(id, recipient, at, |n| {
                n.dismissed_at.get_or_insert(at);
                true
            })
            .await)
    }

    async fn delete(&self, id: NotificationId, recipient: UserId) -> AppResult<bool> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let owned = records
            .get(&id)
            .is_some_and(|n| n.is_owned_by(recipient) && !n.is_expired(now));
        if owned {
            records.remove(&id);
        }
        Ok(owned)
    }

    async fn set_channel_delivery(
        &self,
        id: NotificationId,
        channel: DeliveryChannel,
        outcome: &ChannelDelivery,
    ) -> AppResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(n) => {
                n.delivery_status.set(channel, outcome.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, n| !n.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}
