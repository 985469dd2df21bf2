//! Connection registry: who is online and which group room they sit in.
//!
//! Each user maps to the sessions registered for them, most recent last.
//! Only the most recent session is live and receives `send_to_user`; when
//! it disconnects, the previous one becomes live again. A user counts as
//! offline once their last session is gone.
//!
//! Room membership changes that depend on whether a user is online are
//! made while holding that user's `by_user` entry, so a reconnect racing a
//! disconnect cannot leave an online user outside their room. Lock order is
//! always `by_user` before `rooms`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nestly_core::types::id::{ConnectionId, GroupId, UserId};

use super::handle::{ConnectionHandle, UserSnapshot};
use crate::message::envelope::MessageEnvelope;
use crate::message::types::OutboundMessage;

#[derive(Debug, Clone)]
struct Session {
    snapshot: UserSnapshot,
    handle: Arc<ConnectionHandle>,
}

/// Counts reported by [`ConnectionRegistry::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Registered sessions.
    pub connections: usize,
    /// Distinct online users.
    pub users: usize,
    /// Non-empty rooms.
    pub rooms: usize,
    /// Room memberships across all rooms.
    pub room_members: usize,
}

/// Process-local registry of live sessions and group rooms.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<ConnectionId, Session>,
    by_user: DashMap<UserId, Vec<ConnectionId>>,
    rooms: DashMap<GroupId, HashSet<UserId>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session and make it the user's live one.
    ///
    /// Joins the snapshot's group room and sends `connection:status` to the
    /// new session. Returns the `user:online` message for the caller to
    /// broadcast to the room.
    pub fn register(&self, snapshot: UserSnapshot, handle: Arc<ConnectionHandle>) -> OutboundMessage {
        let connection_id = handle.id();
        let user_id = snapshot.user_id;

        if let Some((_, previous)) = self.sessions.remove(&connection_id) {
            self.release(previous.snapshot.user_id, connection_id);
        }

        self.sessions.insert(
            connection_id,
            Session {
                snapshot: snapshot.clone(),
                handle: handle.clone(),
            },
        );
        {
            let mut sessions = self.by_user.entry(user_id).or_default();
            sessions.push(connection_id);
            if let Some(group_id) = snapshot.group_id {
                self.rooms.entry(group_id).or_default().insert(user_id);
            }
        }

        handle.send(MessageEnvelope::new(OutboundMessage::ConnectionStatus {
            connected: true,
            user_id,
            group_id: snapshot.group_id,
            server_time: Utc::now(),
        }));

        info!(
            user_id = %user_id,
            connection_id = %connection_id,
            group_id = ?snapshot.group_id,
            "Connection registered"
        );

        OutboundMessage::UserOnline {
            user_id,
            group_id: snapshot.group_id,
            display_name: snapshot.display_name,
        }
    }

    /// Remove a session.
    ///
    /// Returns `user:offline` when this was the user's last session, after
    /// removing them from every room. Unknown connections return `None`.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<OutboundMessage> {
        let (_, session) = self.sessions.remove(&connection_id)?;
        session.handle.mark_closed();
        let user_id = session.snapshot.user_id;

        let Some(left) = self.release(user_id, connection_id) else {
            debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Session closed, user still has another session"
            );
            return None;
        };

        let group_id = left.or(session.snapshot.group_id);
        info!(user_id = %user_id, connection_id = %connection_id, "User went offline");

        Some(OutboundMessage::UserOffline { user_id, group_id })
    }

    /// Deliver to the user's live session, stamping `delivered_at`.
    ///
    /// Returns `false` without queuing when the user has no live session or
    /// its channel is closed.
    pub fn send_to_user(&self, user_id: UserId, message: OutboundMessage) -> bool {
        let Some(handle) = self.live_handle(user_id) else {
            debug!(user_id = %user_id, event = message.event_name(), "User not connected");
            return false;
        };

        let delivered = handle.send(MessageEnvelope::new(message));
        if !delivered {
            debug!(user_id = %user_id, connection_id = %handle.id(), "Live session unreachable");
        }
        delivered
    }

    /// Send to every online member of a group room except `exclude`.
    /// Returns how many sessions accepted the message.
    pub fn broadcast_to_group(
        &self,
        group_id: GroupId,
        message: OutboundMessage,
        exclude: Option<UserId>,
    ) -> usize {
        let members = self.room_members(group_id);
        let delivered = members
            .into_iter()
            .filter(|member| Some(*member) != exclude)
            .filter(|member| self.send_to_user(*member, message.clone()))
            .count();

        debug!(
            group_id = %group_id,
            event = message.event_name(),
            delivered,
            "Group broadcast"
        );
        delivered
    }

    /// Add an online user to a room. Offline users are ignored; they join
    /// on their next connect.
    pub fn join_room(&self, group_id: GroupId, user_id: UserId) -> bool {
        let Some(_sessions) = self.by_user.get(&user_id) else {
            return false;
        };
        self.rooms.entry(group_id).or_default().insert(user_id)
    }

    /// Remove a user from a room, deleting the room when it empties.
    pub fn leave_room(&self, group_id: GroupId, user_id: UserId) -> bool {
        let removed = self
            .rooms
            .get_mut(&group_id)
            .is_some_and(|mut members| members.remove(&user_id));
        self.rooms.remove_if(&group_id, |_, members| members.is_empty());
        removed
    }

    /// Whether the user has at least one registered session.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }

    /// Online members of a room.
    pub fn room_members(&self, group_id: GroupId) -> Vec<UserId> {
        self.rooms
            .get(&group_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Users with at least one session.
    pub fn online_users(&self) -> Vec<UserId> {
        self.by_user.iter().map(|entry| *entry.key()).collect()
    }

    /// Current counts.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            connections: self.sessions.len(),
            users: self.by_user.len(),
            rooms: self.rooms.len(),
            room_members: self.rooms.iter().map(|room| room.len()).sum(),
        }
    }

    /// Close every session and clear all state. Returns how many sessions
    /// were closed.
    pub fn close_all(&self) -> usize {
        let count = self.sessions.len();
        for session in self.sessions.iter() {
            session.handle.mark_closed();
        }
        self.sessions.clear();
        self.by_user.clear();
        self.rooms.clear();
        info!(count, "All connections closed");
        count
    }

    fn live_handle(&self, user_id: UserId) -> Option<Arc<ConnectionHandle>> {
        let live = self.by_user.get(&user_id)?.last().copied()?;
        self.sessions.get(&live).map(|session| session.handle.clone())
    }

    /// Drop `connection_id` from the user's sessions.
    ///
    /// Returns `None` while other sessions remain. Otherwise the user leaves
    /// every room before the entry is released, and the room they left is
    /// returned.
    fn release(&self, user_id: UserId, connection_id: ConnectionId) -> Option<Option<GroupId>> {
        match self.by_user.entry(user_id) {
            Entry::Occupied(mut sessions) => {
                sessions.get_mut().retain(|id| *id != connection_id);
                if !sessions.get().is_empty() {
                    return None;
                }
                let left = self.leave_all_rooms(user_id);
                sessions.remove();
                Some(left)
            }
            Entry::Vacant(_unclaimed) => Some(self.leave_all_rooms(user_id)),
        }
    }

    fn leave_all_rooms(&self, user_id: UserId) -> Option<GroupId> {
        let mut left = None;
        for mut room in self.rooms.iter_mut() {
            if room.remove(&user_id) {
                left = Some(*room.key());
            }
        }
        self.rooms.retain(|_, members| !members.is_empty());
        left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connect(
        registry: &ConnectionRegistry,
        user_id: UserId,
        group_id: Option<GroupId>,
    ) -> (ConnectionId, mpsc::Receiver<MessageEnvelope>) {
        let (handle, rx) = ConnectionHandle::channel(16);
        let id = handle.id();
        registry.register(UserSnapshot::new(user_id, group_id), Arc::new(handle));
        (id, rx)
    }

    fn ping() -> OutboundMessage {
        OutboundMessage::Error {
            code: "PING".to_string(),
            message: "ping".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_sends_connection_status() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let (handle, mut rx) = ConnectionHandle::channel(4);
        let online = registry.register(UserSnapshot::new(user, None), Arc::new(handle));

        assert!(matches!(online, OutboundMessage::UserOnline { user_id, .. } if user_id == user));
        let status = rx.recv().await.unwrap();
        assert!(matches!(
            status.message,
            OutboundMessage::ConnectionStatus { connected: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_send_to_absent_user_mutates_nothing() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to_user(UserId::new(), ping()));
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[tokio::test]
    async fn test_send_to_live_session_only() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let (_old, mut old_rx) = connect(&registry, user, None);
        let (_new, mut new_rx) = connect(&registry, user, None);
        old_rx.recv().await.unwrap();
        new_rx.recv().await.unwrap();

        assert!(registry.send_to_user(user, ping()));
        let envelope = new_rx.recv().await.unwrap();
        assert_eq!(envelope.message, ping());
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_older_session_becomes_live_again() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let (_old, mut old_rx) = connect(&registry, user, None);
        let (new, _new_rx) = connect(&registry, user, None);
        old_rx.recv().await.unwrap();

        assert!(registry.unregister(new).is_none());
        assert!(registry.is_online(user));
        assert!(registry.send_to_user(user, ping()));
        assert_eq!(old_rx.recv().await.unwrap().message, ping());
    }

    #[tokio::test]
    async fn test_session_conservation() {
        for (n, m) in [(1, 0), (1, 1), (3, 1), (3, 2), (3, 3), (5, 4)] {
            let registry = ConnectionRegistry::new();
            let user = UserId::new();
            let mut ids = Vec::new();
            let mut receivers = Vec::new();
            for _ in 0..n {
                let (id, rx) = connect(&registry, user, None);
                ids.push(id);
                receivers.push(rx);
            }
            let mut offline = 0;
            for id in ids.iter().take(m) {
                if registry.unregister(*id).is_some() {
                    offline += 1;
                }
            }

            assert_eq!(registry.is_online(user), n > m, "n={n} m={m}");
            assert_eq!(offline, usize::from(n == m), "n={n} m={m}");
        }
    }

    #[tokio::test]
    async fn test_unregister_unknown_connection() {
        let registry = ConnectionRegistry::new();
        assert!(registry.unregister(ConnectionId::new()).is_none());
    }

    #[tokio::test]
    async fn test_offline_leaves_room_and_removes_empty_room() {
        let registry = ConnectionRegistry::new();
        let group = GroupId::new();
        let user = UserId::new();
        let (id, _rx) = connect(&registry, user, Some(group));
        assert_eq!(registry.stats().rooms, 1);

        let offline = registry.unregister(id).unwrap();
        assert_eq!(
            offline,
            OutboundMessage::UserOffline {
                user_id: user,
                group_id: Some(group)
            }
        );
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let registry = ConnectionRegistry::new();
        let group = GroupId::new();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let (_, mut a_rx) = connect(&registry, a, Some(group));
        let (_, mut b_rx) = connect(&registry, b, Some(group));
        let (_, mut c_rx) = connect(&registry, c, Some(group));
        for rx in [&mut a_rx, &mut b_rx, &mut c_rx] {
            rx.recv().await.unwrap();
        }

        let delivered = registry.broadcast_to_group(group, ping(), Some(b));
        assert_eq!(delivered, 2);
        assert_eq!(a_rx.recv().await.unwrap().message, ping());
        assert_eq!(c_rx.recv().await.unwrap().message, ping());
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_and_leave_room() {
        let registry = ConnectionRegistry::new();
        let group = GroupId::new();
        let user = UserId::new();
        assert!(!registry.join_room(group, user));

        let (_id, _rx) = connect(&registry, user, None);
        assert!(registry.join_room(group, user));
        assert_eq!(registry.room_members(group), vec![user]);

        assert!(registry.leave_room(group, user));
        assert_eq!(registry.stats().rooms, 0);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let (_id, _rx) = connect(&registry, user, Some(GroupId::new()));
        assert_eq!(registry.close_all(), 1);
        assert!(!registry.is_online(user));
        assert!(!registry.send_to_user(user, ping()));
    }

    #[test]
    fn test_reconnect_racing_disconnect_keeps_room_membership() {
        let group = GroupId::new();
        for _ in 0..2_000 {
            let registry = ConnectionRegistry::new();
            let user = UserId::new();
            let (old, _old_rx) = connect(&registry, user, Some(group));
            let (handle, _new_rx) = ConnectionHandle::channel(4);
            let handle = Arc::new(handle);
            let barrier = std::sync::Barrier::new(2);

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    barrier.wait();
                    registry.unregister(old);
                });
                scope.spawn(|| {
                    barrier.wait();
                    registry.register(UserSnapshot::new(user, Some(group)), handle.clone());
                });
            });

            assert!(registry.is_online(user));
            assert_eq!(registry.room_members(group), vec![user]);
        }
    }
}
