//! AI assistant domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::{GroupId, TaskId, UserId};

/// Events raised by the AI task assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiEvent {
    /// A member confirmed a batch of AI-suggested tasks.
    TasksConfirmed {
        /// The group the tasks were created in.
        group_id: GroupId,
        /// Member who confirmed.
        confirmed_by: UserId,
        /// Display name of that member.
        confirmed_by_name: String,
        /// Created tasks.
        task_ids: Vec<TaskId>,
        /// Titles of the created tasks, same order as `task_ids`.
        task_titles: Vec<String>,
    },
}

impl AiEvent {
    /// The group concerned.
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::TasksConfirmed { group_id, .. } => *group_id,
        }
    }
}
