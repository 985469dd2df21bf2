//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use nestly_core::types::id::{ConnectionId, GroupId, UserId};

use crate::message::envelope::MessageEnvelope;

/// Identity the gateway resolved for a session.
///
/// The registry trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// The authenticated user.
    pub user_id: UserId,
    /// Their group at connect time.
    pub group_id: Option<GroupId>,
    /// Display name, when known.
    pub display_name: Option<String>,
}

impl UserSnapshot {
    /// Snapshot with no display name.
    pub fn new(user_id: UserId, group_id: Option<GroupId>) -> Self {
        Self {
            user_id,
            group_id,
            display_name: None,
        }
    }
}

/// Sending half of one client session.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<MessageEnvelope>,
    connected_at: DateTime<Utc>,
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Wrap an existing sender.
    pub fn new(sender: mpsc::Sender<MessageEnvelope>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Create a handle together with the receiver the socket forwarder drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<MessageEnvelope>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// When the session connected.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue an envelope without waiting.
    pub fn send(&self, envelope: MessageEnvelope) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Whether the session can still receive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    /// Stop accepting messages.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
