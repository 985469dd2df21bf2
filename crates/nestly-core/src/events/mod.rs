//! Domain events published on the event bus.
//!
//! Producers (task, expense and group services) publish these facts; the
//! notification subscriber and any other consumer subscribe by
//! [`EventKind`] without the producer knowing about them. Payloads are a
//! tagged union, so every consumer matches on a closed set of shapes.

pub mod ai;
pub mod expense;
pub mod group;
pub mod notification;
pub mod presence;
pub mod task;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::id::{GroupId, UserId};

pub use ai::AiEvent;
pub use expense::ExpenseEvent;
pub use group::GroupEvent;
pub use notification::NotificationEvent;
pub use presence::PresenceEvent;
pub use task::{TaskEvent, TaskPriority};

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<UserId>,
    /// The event payload.
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<UserId>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }

    /// The routing key subscribers register against.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// The group this event concerns, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match &self.payload {
            EventPayload::Task(e) => Some(e.group_id()),
            EventPayload::Expense(e) => Some(e.group_id()),
            EventPayload::Group(e) => Some(e.group_id()),
            EventPayload::Ai(e) => Some(e.group_id()),
            EventPayload::Presence(e) => e.group_id(),
            EventPayload::Notification(e) => e.group_id(),
        }
    }
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum EventPayload {
    /// A task-related event.
    Task(TaskEvent),
    /// An expense-related event.
    Expense(ExpenseEvent),
    /// A group membership event.
    Group(GroupEvent),
    /// An AI assistant event.
    Ai(AiEvent),
    /// A connection presence event.
    Presence(PresenceEvent),
    /// An internal notification lifecycle event.
    Notification(NotificationEvent),
}

impl EventPayload {
    /// Routing key for this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Task(TaskEvent::Assigned { .. }) => EventKind::TaskAssigned,
            Self::Task(TaskEvent::Completed { .. }) => EventKind::TaskCompleted,
            Self::Task(TaskEvent::DueSoon { .. }) => EventKind::TaskDueSoon,
            Self::Expense(ExpenseEvent::Added { .. }) => EventKind::ExpenseAdded,
            Self::Expense(ExpenseEvent::SplitPaid { .. }) => EventKind::ExpenseSplitPaid,
            Self::Expense(ExpenseEvent::FullySettled { .. }) => EventKind::ExpenseFullySettled,
            Self::Group(GroupEvent::MemberJoined { .. }) => EventKind::GroupMemberJoined,
            Self::Group(GroupEvent::MemberLeft { .. }) => EventKind::GroupMemberLeft,
            Self::Group(GroupEvent::RoleChanged { .. }) => EventKind::GroupRoleChanged,
            Self::Ai(AiEvent::TasksConfirmed { .. }) => EventKind::AiTasksConfirmed,
            Self::Presence(PresenceEvent::Online { .. }) => EventKind::UserOnline,
            Self::Presence(PresenceEvent::Offline { .. }) => EventKind::UserOffline,
            Self::Notification(NotificationEvent::Created { .. }) => {
                EventKind::NotificationCreated
            }
        }
    }
}

/// Closed set of event identifiers handlers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// `task.assigned`
    #[serde(rename = "task.assigned")]
    TaskAssigned,
    /// `task.completed`
    #[serde(rename = "task.completed")]
    TaskCompleted,
    /// `task.due_soon`
    #[serde(rename = "task.due_soon")]
    TaskDueSoon,
    /// `expense.added`
    #[serde(rename = "expense.added")]
    ExpenseAdded,
    /// `expense.split_paid`
    #[serde(rename = "expense.split_paid")]
    ExpenseSplitPaid,
    /// `expense.fully_settled`
    #[serde(rename = "expense.fully_settled")]
    ExpenseFullySettled,
    /// `group.member_joined`
    #[serde(rename = "group.member_joined")]
    GroupMemberJoined,
    /// `group.member_left`
    #[serde(rename = "group.member_left")]
    GroupMemberLeft,
    /// `group.role_changed`
    #[serde(rename = "group.role_changed")]
    GroupRoleChanged,
    /// `ai.tasks_confirmed`
    #[serde(rename = "ai.tasks_confirmed")]
    AiTasksConfirmed,
    /// `user.online`
    #[serde(rename = "user.online")]
    UserOnline,
    /// `user.offline`
    #[serde(rename = "user.offline")]
    UserOffline,
    /// `notification.created`
    #[serde(rename = "notification.created")]
    NotificationCreated,
}

impl EventKind {
    /// Kinds produced by domain services that can turn into notifications.
    pub const DOMAIN: [EventKind; 10] = [
        Self::TaskAssigned,
        Self::TaskCompleted,
        Self::TaskDueSoon,
        Self::ExpenseAdded,
        Self::ExpenseSplitPaid,
        Self::ExpenseFullySettled,
        Self::GroupMemberJoined,
        Self::GroupMemberLeft,
        Self::GroupRoleChanged,
        Self::AiTasksConfirmed,
    ];

    /// Dotted event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskAssigned => "task.assigned",
            Self::TaskCompleted => "task.completed",
            Self::TaskDueSoon => "task.due_soon",
            Self::ExpenseAdded => "expense.added",
            Self::ExpenseSplitPaid => "expense.split_paid",
            Self::ExpenseFullySettled => "expense.fully_settled",
            Self::GroupMemberJoined => "group.member_joined",
            Self::GroupMemberLeft => "group.member_left",
            Self::GroupRoleChanged => "group.role_changed",
            Self::AiTasksConfirmed => "ai.tasks_confirmed",
            Self::UserOnline => "user.online",
            Self::UserOffline => "user.offline",
            Self::NotificationCreated => "notification.created",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
