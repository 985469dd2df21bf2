//! Connection presence events.

use serde::{Deserialize, Serialize};

use crate::types::id::{GroupId, UserId};

/// Emitted by the realtime gateway when a user's presence changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// The user opened a live session.
    Online {
        /// The user.
        user_id: UserId,
        /// The user's group at connect time.
        group_id: Option<GroupId>,
    },
    /// The user's last live session closed.
    Offline {
        /// The user.
        user_id: UserId,
        /// The group room the user was in.
        group_id: Option<GroupId>,
    },
}

impl PresenceEvent {
    /// The group room concerned, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Online { group_id, .. } | Self::Offline { group_id, .. } => *group_id,
        }
    }
}
