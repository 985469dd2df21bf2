//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::error::TryRecvError;

use nestly_core::events::{DomainEvent, EventPayload};
use nestly_core::types::id::{GroupId, UserId};
use nestly_database::{MemoryGroupDirectory, MemoryNotificationStore};
use nestly_realtime::{
    ConnectionHandle, ConnectionRegistry, EventBus, MessageEnvelope, UserSnapshot,
};
use nestly_service::{NotificationRules, NotificationService, NotificationSubscriber};

/// Everything a producer and a client see, wired like the server does.
pub struct TestApp {
    /// Event bus
    pub bus: Arc<EventBus>,
    /// Live sessions and rooms
    pub registry: Arc<ConnectionRegistry>,
    /// Group membership
    pub directory: Arc<MemoryGroupDirectory>,
    /// Notification orchestrator
    pub service: NotificationService,
}

impl TestApp {
    /// Create a new test application with the subscriber attached
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = Arc::new(MemoryGroupDirectory::new());
        let service = NotificationService::new(
            Arc::new(MemoryNotificationStore::new()),
            Arc::clone(&registry),
            Arc::clone(&bus),
            chrono::Duration::days(30),
        );

        let subscriber = Arc::new(NotificationSubscriber::new(
            NotificationRules::new(directory.clone()),
            service.clone(),
            Arc::clone(&registry),
            true,
        ));
        subscriber.attach(&bus);

        Self {
            bus,
            registry,
            directory,
            service,
        }
    }

    /// Create a group with `n` members.
    pub fn household(&self, n: usize) -> (GroupId, Vec<UserId>) {
        let group = GroupId::new();
        let members: Vec<UserId> = (0..n).map(|_| UserId::new()).collect();
        for member in &members {
            self.directory.add_member(group, *member);
        }
        (group, members)
    }

    /// Open a session for `user` in `group`, with `connection:status` drained.
    pub fn connect(&self, user: UserId, group: Option<GroupId>) -> Receiver<MessageEnvelope> {
        let (handle, mut rx) = ConnectionHandle::channel(32);
        self.registry
            .register(UserSnapshot::new(user, group), Arc::new(handle));
        let status = rx.try_recv().expect("connection:status");
        assert_eq!(status.message.event_name(), "connection:status");
        rx
    }

    /// Publish and wait for every async handler to finish.
    pub async fn publish(&self, actor: Option<UserId>, payload: EventPayload) {
        assert!(self.bus.publish(DomainEvent::new(actor, payload)));
        self.bus.wait_idle().await;
    }
}

/// Next envelope on a session, failing after one second.
pub async fn next_message(rx: &mut Receiver<MessageEnvelope>) -> MessageEnvelope {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("session channel closed")
}

/// Assert nothing is queued on a session.
pub fn assert_silent(rx: &mut Receiver<MessageEnvelope>) {
    match rx.try_recv() {
        Err(TryRecvError::Empty) => {}
        other => panic!("expected no message, got {other:?}"),
    }
}
