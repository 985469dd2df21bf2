//! Notification creation, delivery and lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nestly_core::error::AppError;
use nestly_core::events::{DomainEvent, EventPayload, NotificationEvent};
use nestly_core::result::AppResult;
use nestly_core::traits::DeliveryOutcome;
use nestly_core::types::id::{GroupId, NotificationId, UserId};
use nestly_core::types::pagination::PageResponse;
use nestly_database::store::{NotificationQuery, NotificationStore};
use nestly_entity::notification::{ChannelDelivery, DeliveryChannel, NewNotification, Notification};
use nestly_realtime::bus::EventBus;
use nestly_realtime::connection::ConnectionRegistry;
use nestly_realtime::message::OutboundMessage;

/// Result of [`NotificationService::mark_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOutcome {
    /// The notification flipped to read.
    Marked,
    /// It was already read; nothing changed and nothing was echoed.
    AlreadyRead,
}

/// Sole writer of notification records.
///
/// Persists first, then pushes best-effort over the caller's live session.
/// Only a persistence failure is reported back to the caller.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    registry: Arc<ConnectionRegistry>,
    bus: Arc<EventBus>,
    retention: chrono::Duration,
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        registry: Arc<ConnectionRegistry>,
        bus: Arc<EventBus>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            store,
            registry,
            bus,
            retention,
        }
    }

    /// Validate, persist and push a notification.
    pub async fn create_and_deliver(&self, draft: NewNotification) -> AppResult<Notification> {
        draft.check()?;

        let now = Utc::now();
        let mut notification = self
            .store
            .insert(&Notification::from_draft(draft, now, self.retention))
            .await?;

        // The pushed copy only reaches the client when the send succeeds, so
        // it carries the realtime outcome that is recorded afterwards.
        let outcome = ChannelDelivery::delivered(Utc::now(), None);
        let mut pushed = notification.clone();
        pushed
            .delivery_status
            .set(DeliveryChannel::Realtime, outcome.clone());
        let delivered = self.registry.send_to_user(
            notification.recipient_id,
            OutboundMessage::NotificationNew(Box::new(pushed)),
        );

        if delivered {
            match self
                .store
                .set_channel_delivery(notification.id, DeliveryChannel::Realtime, &outcome)
                .await
            {
                Ok(_) => notification.delivery_status.set(DeliveryChannel::Realtime, outcome),
                Err(e) => warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Failed to record realtime delivery"
                ),
            }
        }

        debug!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            notification_type = %notification.notification_type,
            delivered_realtime = delivered,
            "Notification created"
        );

        self.bus.publish(DomainEvent::new(
            None,
            EventPayload::Notification(NotificationEvent::Created {
                notification_id: notification.id,
                recipient_id: notification.recipient_id,
                group_id: notification.group_id,
                notification_type: notification.notification_type.as_str().to_string(),
                delivered_realtime: delivered,
            }),
        ));

        Ok(notification)
    }

    /// Newest-first page of the recipient's notifications.
    pub async fn list(
        &self,
        recipient: UserId,
        mut query: NotificationQuery,
    ) -> AppResult<PageResponse<Notification>> {
        query.page = query.page.normalized();
        self.store.list(recipient, &query, Utc::now()).await
    }

    /// Count the recipient's visible notifications.
    pub async fn count(
        &self,
        recipient: UserId,
        unread_only: bool,
        group_id: Option<GroupId>,
    ) -> AppResult<u64> {
        self.store
            .count(recipient, unread_only, group_id, Utc::now())
            .await
    }

    /// Mark one notification read.
    ///
    /// Fails with `NotFound` when the caller does not own it.
    pub async fn mark_read(&self, id: NotificationId, caller: UserId) -> AppResult<ReadOutcome> {
        let now = Utc::now();
        if let Some(notification) = self.store.mark_read(id, caller, now).await? {
            self.registry.send_to_user(
                caller,
                OutboundMessage::NotificationRead {
                    notification_id: id,
                    read_at: notification.read_at.unwrap_or(now),
                },
            );
            return Ok(ReadOutcome::Marked);
        }

        match self.store.find_by_id(id).await? {
            Some(n) if n.is_owned_by(caller) && n.is_read => Ok(ReadOutcome::AlreadyRead),
            _ => Err(not_found(id)),
        }
    }

    /// Mark every unread notification of the caller read, optionally
    /// within one group.
    pub async fn mark_all_read(&self, caller: UserId, group_id: Option<GroupId>) -> AppResult<u64> {
        let count = self.store.mark_all_read(caller, group_id, Utc::now()).await?;
        if count > 0 {
            self.registry.send_to_user(
                caller,
                OutboundMessage::NotificationAllRead { count, group_id },
            );
        }
        Ok(count)
    }

    /// Hide a notification until `until`.
    pub async fn snooze(
        &self,
        id: NotificationId,
        caller: UserId,
        until: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let notification = self
            .store
            .snooze(id, caller, until)
            .await?
            .ok_or_else(|| not_found(id))?;

        self.registry.send_to_user(
            caller,
            OutboundMessage::NotificationSnoozed {
                notification_id: id,
                snoozed_until: until,
            },
        );
        Ok(notification)
    }

    /// Clear a snooze early.
    pub async fn unsnooze(&self, id: NotificationId, caller: UserId) -> AppResult<Notification> {
        self.store
            .unsnooze(id, caller)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Reactivate every notification whose snooze has elapsed.
    pub async fn sweep_expired_snoozes(&self) -> AppResult<u64> {
        let cleared = self.store.sweep_expired_snoozes(Utc::now()).await?;
        if cleared > 0 {
            info!(cleared, "Expired snoozes cleared");
        }
        Ok(cleared)
    }

    /// Record that the caller opened the notification.
    pub async fn click(&self, id: NotificationId, caller: UserId) -> AppResult<Notification> {
        self.store
            .mark_clicked(id, caller, Utc::now())
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Record that the caller dismissed the notification.
    pub async fn dismiss(&self, id: NotificationId, caller: UserId) -> AppResult<Notification> {
        self.store
            .mark_dismissed(id, caller, Utc::now())
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Remove a notification.
    pub async fn delete(&self, id: NotificationId, caller: UserId) -> AppResult<()> {
        if !self.store.delete(id, caller).await? {
            return Err(not_found(id));
        }
        self.registry.send_to_user(
            caller,
            OutboundMessage::NotificationDeleted {
                notification_id: id,
            },
        );
        Ok(())
    }

    /// Store an email or push outcome reported by a producer.
    pub async fn record_channel_delivery(
        &self,
        id: NotificationId,
        channel: DeliveryChannel,
        outcome: &DeliveryOutcome,
    ) -> AppResult<()> {
        let now = Utc::now();
        let delivery = match outcome {
            DeliveryOutcome::Sent { message_id } => {
                ChannelDelivery::delivered(now, Some(message_id.clone()))
            }
            DeliveryOutcome::Failed { .. } => ChannelDelivery::failed(now),
        };

        if !self.store.set_channel_delivery(id, channel, &delivery).await? {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Physically delete expired notifications.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let purged = self.store.purge_expired(Utc::now()).await?;
        if purged > 0 {
            info!(purged, "Expired notifications purged");
        }
        Ok(purged)
    }
}

fn not_found(id: NotificationId) -> AppError {
    AppError::not_found(format!("Notification {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nestly_core::error::ErrorKind;
    use nestly_core::events::EventKind;
    use nestly_database::memory::MemoryNotificationStore;
    use nestly_entity::notification::NotificationType;
    use nestly_realtime::connection::{ConnectionHandle, UserSnapshot};
    use nestly_realtime::message::MessageEnvelope;
    use tokio::sync::mpsc;

    struct Fixture {
        service: NotificationService,
        registry: Arc<ConnectionRegistry>,
        bus: Arc<EventBus>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let bus = Arc::new(EventBus::new());
        let service = NotificationService::new(
            Arc::new(MemoryNotificationStore::new()),
            registry.clone(),
            bus.clone(),
            Duration::days(30),
        );
        Fixture {
            service,
            registry,
            bus,
        }
    }

    fn connect(registry: &ConnectionRegistry, user: UserId) -> mpsc::Receiver<MessageEnvelope> {
        let (handle, mut rx) = ConnectionHandle::channel(16);
        registry.register(UserSnapshot::new(user, None), Arc::new(handle));
        let _ = rx.try_recv();
        rx
    }

    fn draft(user: UserId) -> NewNotification {
        NewNotification::new(user, NotificationType::System, "Welcome", "Welcome to the house")
    }

    #[tokio::test]
    async fn test_create_for_offline_user() {
        let f = fixture();
        let user = UserId::new();
        let created = f.service.create_and_deliver(draft(user)).await.unwrap();

        assert!(!created.delivery_status.realtime.delivered);
        assert_eq!(f.service.count(user, true, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_for_online_user_pushes_and_records() {
        let f = fixture();
        let user = UserId::new();
        let mut rx = connect(&f.registry, user);

        let created = f.service.create_and_deliver(draft(user)).await.unwrap();
        assert!(created.delivery_status.realtime.delivered);

        let envelope = rx.recv().await.unwrap();
        match envelope.message {
            OutboundMessage::NotificationNew(n) => {
                assert_eq!(n.id, created.id);
                assert_eq!(n.delivery_status, created.delivery_status);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_publishes_notification_created() {
        let f = fixture();
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let s = seen.clone();
        f.bus.subscribe(EventKind::NotificationCreated, move |_| {
            s.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        f.service.create_and_deliver(draft(UserId::new())).await.unwrap();
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected_without_persisting() {
        let f = fixture();
        let user = UserId::new();
        let err = f
            .service
            .create_and_deliver(NewNotification::new(user, NotificationType::System, "", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(f.service.count(user, false, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent_and_echoes_once() {
        let f = fixture();
        let user = UserId::new();
        let created = f.service.create_and_deliver(draft(user)).await.unwrap();
        let mut rx = connect(&f.registry, user);

        assert_eq!(f.service.mark_read(created.id, user).await.unwrap(), ReadOutcome::Marked);
        assert!(matches!(
            rx.recv().await.unwrap().message,
            OutboundMessage::NotificationRead { .. }
        ));

        assert_eq!(
            f.service.mark_read(created.id, user).await.unwrap(),
            ReadOutcome::AlreadyRead
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mark_read_by_other_user_is_not_found() {
        let f = fixture();
        let owner = UserId::new();
        let created = f.service.create_and_deliver(draft(owner)).await.unwrap();

        let err = f.service.mark_read(created.id, UserId::new()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = f.service.delete(created.id, UserId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_at_set_iff_is_read() {
        let f = fixture();
        let user = UserId::new();
        for _ in 0..3 {
            f.service.create_and_deliver(draft(user)).await.unwrap();
        }
        let first = f.service.list(user, NotificationQuery::default()).await.unwrap().items[0].id;
        f.service.mark_read(first, user).await.unwrap();

        let mut query = NotificationQuery::default();
        query.include_snoozed = true;
        for n in f.service.list(user, query).await.unwrap().items {
            assert_eq!(n.is_read, n.read_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_snooze_in_past_then_sweep() {
        let f = fixture();
        let user = UserId::new();
        let created = f.service.create_and_deliver(draft(user)).await.unwrap();

        let snoozed = f
            .service
            .snooze(created.id, user, Utc::now() - Duration::milliseconds(1))
            .await
            .unwrap();
        assert!(snoozed.is_snoozed);
        assert_eq!(snoozed.snooze_count, 1);

        assert_eq!(f.service.sweep_expired_snoozes().await.unwrap(), 1);
        let page = f.service.list(user, NotificationQuery::default()).await.unwrap();
        assert!(!page.items[0].is_snoozed);
        assert!(page.items[0].snoozed_until.is_none());
        assert_eq!(f.service.sweep_expired_snoozes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_echoes_only_when_something_changed() {
        let f = fixture();
        let user = UserId::new();
        f.service.create_and_deliver(draft(user)).await.unwrap();
        let mut rx = connect(&f.registry, user);

        assert_eq!(f.service.mark_all_read(user, None).await.unwrap(), 1);
        assert!(matches!(
            rx.recv().await.unwrap().message,
            OutboundMessage::NotificationAllRead { count: 1, .. }
        ));
        assert_eq!(f.service.mark_all_read(user, None).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_click_and_dismiss_do_not_touch_read_state() {
        let f = fixture();
        let user = UserId::new();
        let created = f.service.create_and_deliver(draft(user)).await.unwrap();

        let clicked = f.service.click(created.id, user).await.unwrap();
        assert!(clicked.clicked_at.is_some());
        assert!(!clicked.is_read);

        let dismissed = f.service.dismiss(created.id, user).await.unwrap();
        assert!(dismissed.dismissed_at.is_some());
        assert_eq!(f.service.count(user, false, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_echoes() {
        let f = fixture();
        let user = UserId::new();
        let created = f.service.create_and_deliver(draft(user)).await.unwrap();
        let mut rx = connect(&f.registry, user);

        f.service.delete(created.id, user).await.unwrap();
        assert!(matches!(
            rx.recv().await.unwrap().message,
            OutboundMessage::NotificationDeleted { notification_id } if notification_id == created.id
        ));
    }

    #[tokio::test]
    async fn test_record_channel_delivery() {
        let f = fixture();
        let user = UserId::new();
        let created = f.service.create_and_deliver(draft(user)).await.unwrap();

        f.service
            .record_channel_delivery(
                created.id,
                DeliveryChannel::Email,
                &DeliveryOutcome::Sent {
                    message_id: "msg-42".to_string(),
                },
            )
            .await
            .unwrap();

        let page = f.service.list(user, NotificationQuery::default()).await.unwrap();
        let email = &page.items[0].delivery_status.email;
        assert!(email.delivered);
        assert_eq!(email.message_id.as_deref(), Some("msg-42"));

        let err = f
            .service
            .record_channel_delivery(
                NotificationId::new(),
                DeliveryChannel::Push,
                &DeliveryOutcome::Failed {
                    reason: "no device".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_far_past_last_page_is_empty() {
        let f = fixture();
        let user = UserId::new();
        f.service.create_and_deliver(draft(user)).await.unwrap();

        let page = f
            .service
            .list(user, NotificationQuery::page(u64::MAX, 20))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 1);
        assert!(!page.has_next);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mark_read_has_one_winner() {
        let f = fixture();
        let service = Arc::new(f.service);
        let user = UserId::new();

        for _ in 0..50 {
            let created = service.create_and_deliver(draft(user)).await.unwrap();
            let mut rx = connect(&f.registry, user);

            let calls: Vec<_> = (0..8)
                .map(|_| {
                    let service = service.clone();
                    tokio::spawn(async move { service.mark_read(created.id, user).await })
                })
                .collect();

            let mut marked = 0;
            for call in calls {
                if call.await.unwrap().unwrap() == ReadOutcome::Marked {
                    marked += 1;
                }
            }
            assert_eq!(marked, 1);

            let mut echoes = 0;
            while let Ok(envelope) = rx.try_recv() {
                if matches!(envelope.message, OutboundMessage::NotificationRead { .. }) {
                    echoes += 1;
                }
            }
            assert_eq!(echoes, 1);

            let stored = service
                .list(user, NotificationQuery::page(1, 1))
                .await
                .unwrap();
            let record = &stored.items[0];
            assert!(record.is_read && record.read_at.is_some());
        }
    }
}
