//! Group membership domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::{GroupId, UserId};

/// Events related to household group membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupEvent {
    /// A member joined the group.
    MemberJoined {
        /// The group.
        group_id: GroupId,
        /// Group display name.
        group_name: String,
        /// The new member.
        user_id: UserId,
        /// Display name of the new member.
        user_name: String,
    },
    /// A member left or was removed from the group.
    MemberLeft {
        /// The group.
        group_id: GroupId,
        /// Group display name.
        group_name: String,
        /// The departing member.
        user_id: UserId,
        /// Display name of the departing member.
        user_name: String,
    },
    /// A member's role changed.
    RoleChanged {
        /// The group.
        group_id: GroupId,
        /// Group display name.
        group_name: String,
        /// Member whose role changed.
        user_id: UserId,
        /// Previous role.
        old_role: String,
        /// New role.
        new_role: String,
        /// Member who made the change.
        changed_by: UserId,
        /// Display name of that member.
        changed_by_name: String,
    },
}

impl GroupEvent {
    /// The group concerned.
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::MemberJoined { group_id, .. }
            | Self::MemberLeft { group_id, .. }
            | Self::RoleChanged { group_id, .. } => *group_id,
        }
    }
}
