//! Notification type enumeration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// A task was assigned to the recipient.
    TaskAssigned,
    /// Someone in the group completed a task.
    TaskCompleted,
    /// One of the recipient's tasks is due soon.
    TaskDueSoon,
    /// The recipient shares a new expense.
    ExpenseAdded,
    /// A participant paid back their split.
    ExpenseSplitPaid,
    /// An expense is fully settled.
    ExpenseSettled,
    /// A member joined the group.
    GroupMemberJoined,
    /// A member left the group.
    GroupMemberLeft,
    /// The recipient's role changed.
    GroupRoleChanged,
    /// AI-suggested tasks were confirmed.
    AiTasksConfirmed,
    /// System message.
    System,
}

impl NotificationType {
    /// Return the stored identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskAssigned => "TASK_ASSIGNED",
            Self::TaskCompleted => "TASK_COMPLETED",
            Self::TaskDueSoon => "TASK_DUE_SOON",
            Self::ExpenseAdded => "EXPENSE_ADDED",
            Self::ExpenseSplitPaid => "EXPENSE_SPLIT_PAID",
            Self::ExpenseSettled => "EXPENSE_SETTLED",
            Self::GroupMemberJoined => "GROUP_MEMBER_JOINED",
            Self::GroupMemberLeft => "GROUP_MEMBER_LEFT",
            Self::GroupRoleChanged => "GROUP_ROLE_CHANGED",
            Self::AiTasksConfirmed => "AI_TASKS_CONFIRMED",
            Self::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TASK_ASSIGNED" => Ok(Self::TaskAssigned),
            "TASK_COMPLETED" => Ok(Self::TaskCompleted),
            "TASK_DUE_SOON" => Ok(Self::TaskDueSoon),
            "EXPENSE_ADDED" => Ok(Self::ExpenseAdded),
            "EXPENSE_SPLIT_PAID" => Ok(Self::ExpenseSplitPaid),
            "EXPENSE_SETTLED" => Ok(Self::ExpenseSettled),
            "GROUP_MEMBER_JOINED" => Ok(Self::GroupMemberJoined),
            "GROUP_MEMBER_LEFT" => Ok(Self::GroupMemberLeft),
            "GROUP_ROLE_CHANGED" => Ok(Self::GroupRoleChanged),
            "AI_TASKS_CONFIRMED" => Ok(Self::AiTasksConfirmed),
            "SYSTEM" => Ok(Self::System),
            other => Err(format!("Unknown notification type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_as_str() {
        for kind in [
            NotificationType::TaskAssigned,
            NotificationType::ExpenseSettled,
            NotificationType::AiTasksConfirmed,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<NotificationType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!("TASK_DELETED".parse::<NotificationType>().is_err());
    }
}
