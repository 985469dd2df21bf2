//! In-memory group directory.

use async_trait::async_trait;
use dashmap::DashMap;

use nestly_core::result::AppResult;
use nestly_core::types::id::{GroupId, UserId};

use crate::store::GroupDirectory;

/// Membership table held in process memory.
#[derive(Debug, Default)]
pub struct MemoryGroupDirectory {
    members: DashMap<GroupId, Vec<UserId>>,
    group_by_user: DashMap<UserId, GroupId>,
}

impl MemoryGroupDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` to `group_id`, moving them out of any previous group.
    pub fn add_member(&self, group_id: GroupId, user_id: UserId) {
        if let Some(previous) = self.group_by_user.insert(user_id, group_id) {
            if previous != group_id {
                if let Some(mut list) = self.members.get_mut(&previous) {
                    list.retain(|u| *u != user_id);
                }
            }
        }
        let mut list = self.members.entry(group_id).or_default();
        if !list.contains(&user_id) {
            list.push(user_id);
        }
    }

    /// Remove `user_id` from `group_id`.
    pub fn remove_member(&self, group_id: GroupId, user_id: UserId) {
        if let Some(mut list) = self.members.get_mut(&group_id) {
            list.retain(|u| *u != user_id);
        }
        self.group_by_user.remove_if(&user_id, |_, g| *g == group_id);
    }
}

#[async_trait]
impl GroupDirectory for MemoryGroupDirectory {
    async fn members(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        Ok(self
            .members
            .get(&group_id)
            .map(|list| list.clone())
            .unwrap_or_default())
    }

    async fn group_of(&self, user_id: UserId) -> AppResult<Option<GroupId>> {
        Ok(self.group_by_user.get(&user_id).map(|g| *g))
    }
}
