//! Task-related domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{GroupId, TaskId, UserId};

/// Priority a producer attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// High priority.
    High,
    /// Urgent.
    Urgent,
}

/// Events related to household tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// A task was assigned to a member.
    Assigned {
        /// The task.
        task_id: TaskId,
        /// Owning group.
        group_id: GroupId,
        /// Task title.
        title: String,
        /// Member receiving the task.
        assignee_id: UserId,
        /// Member who assigned it.
        assigned_by: UserId,
        /// Display name of the assigner.
        assigned_by_name: String,
        /// Task priority.
        #[serde(default)]
        priority: TaskPriority,
        /// Optional due date.
        #[serde(default)]
        due_date: Option<DateTime<Utc>>,
    },
    /// A task was completed.
    Completed {
        /// The task.
        task_id: TaskId,
        /// Owning group.
        group_id: GroupId,
        /// Task title.
        title: String,
        /// Member who completed it.
        completed_by: UserId,
        /// Display name of the completer.
        completed_by_name: String,
    },
    /// A task's due date is approaching.
    DueSoon {
        /// The task.
        task_id: TaskId,
        /// Owning group.
        group_id: GroupId,
        /// Task title.
        title: String,
        /// Current assignee.
        assignee_id: UserId,
        /// Due date.
        due_date: DateTime<Utc>,
    },
}

impl TaskEvent {
    /// The group owning the task.
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::Assigned { group_id, .. }
            | Self::Completed { group_id, .. }
            | Self::DueSoon { group_id, .. } => *group_id,
        }
    }
}
