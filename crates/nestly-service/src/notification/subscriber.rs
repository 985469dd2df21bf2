//! Wires the notification rules onto the event bus.

use std::sync::Arc;

use tracing::{debug, error, info};

use nestly_core::events::{DomainEvent, EventKind};
use nestly_core::result::AppResult;
use nestly_realtime::bus::{EventBus, SubscriptionId};
use nestly_realtime::connection::ConnectionRegistry;
use nestly_realtime::message::OutboundMessage;

use super::rules::{NotificationRules, RoomChange};
use super::service::NotificationService;

/// Turns domain events into notifications, feed items and room updates.
#[derive(Debug, Clone)]
pub struct NotificationSubscriber {
    rules: NotificationRules,
    service: NotificationService,
    registry: Arc<ConnectionRegistry>,
    live_room_refresh: bool,
}

impl NotificationSubscriber {
    /// Creates a new subscriber.
    pub fn new(
        rules: NotificationRules,
        service: NotificationService,
        registry: Arc<ConnectionRegistry>,
        live_room_refresh: bool,
    ) -> Self {
        Self {
            rules,
            service,
            registry,
            live_room_refresh,
        }
    }

    /// Register one async handler per domain event kind.
    pub fn attach(self: Arc<Self>, bus: &EventBus) -> Vec<SubscriptionId> {
        let ids: Vec<SubscriptionId> = EventKind::DOMAIN
            .iter()
            .map(|kind| {
                let subscriber = Arc::clone(&self);
                bus.subscribe_async(*kind, move |event| {
                    let subscriber = Arc::clone(&subscriber);
                    async move { subscriber.handle(event).await }
                })
            })
            .collect();

        info!(handlers = ids.len(), "Notification subscriber attached");
        ids
    }

    /// Apply one event. Per-recipient failures are logged and do not
    /// abort the remaining recipients.
    pub async fn handle(&self, event: DomainEvent) -> AppResult<()> {
        let kind = event.kind();
        let plan = self.rules.plan(&event).await?;
        if plan.is_empty() {
            debug!(event = %kind, "No notifications for event");
            return Ok(());
        }

        if let Some(change) = plan.room {
            self.apply_room_change(change);
        }

        if let Some((group_id, activity, exclude)) = plan.activity {
            self.registry.broadcast_to_group(
                group_id,
                OutboundMessage::GroupActivity(activity),
                exclude,
            );
        }

        for draft in plan.notifications {
            let recipient = draft.recipient_id;
            let notification_type = draft.notification_type;
            if let Err(e) = self.service.create_and_deliver(draft).await {
                error!(
                    event = %kind,
                    recipient = %recipient,
                    notification_type = notification_type.as_str(),
                    error = %e,
                    "Failed to create notification"
                );
            }
        }

        Ok(())
    }

    fn apply_room_change(&self, change: RoomChange) {
        if !self.live_room_refresh {
            return;
        }
        match change {
            RoomChange::Join { group_id, user_id } => {
                if self.registry.join_room(group_id, user_id) {
                    debug!(group_id = %group_id, user_id = %user_id, "Joined room");
                }
            }
            RoomChange::Leave { group_id, user_id } => {
                if self.registry.leave_room(group_id, user_id) {
                    debug!(group_id = %group_id, user_id = %user_id, "Left room");
                }
            }
        }
    }
}
