//! Notification rules: which domain event notifies whom, and how.
//!
//! The table is a single `match` over [`EventPayload`], so adding an event
//! kind without deciding its recipients fails to compile.

use std::sync::Arc;

use serde_json::json;

use nestly_core::events::expense::format_amount;
use nestly_core::events::{
    AiEvent, DomainEvent, EventPayload, ExpenseEvent, GroupEvent, TaskEvent, TaskPriority,
};
use nestly_core::result::AppResult;
use nestly_core::types::id::{GroupId, UserId};
use nestly_database::store::GroupDirectory;
use nestly_entity::notification::{NewNotification, NotificationPriority, NotificationType};
use nestly_realtime::message::{ActivityActor, GroupActivity};

/// Live room membership change implied by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomChange {
    /// Add the user to the group's room.
    Join {
        /// The group.
        group_id: GroupId,
        /// The user.
        user_id: UserId,
    },
    /// Remove the user from the group's room.
    Leave {
        /// The group.
        group_id: GroupId,
        /// The user.
        user_id: UserId,
    },
}

/// Everything one event turns into.
#[derive(Debug, Clone, Default)]
pub struct DeliveryPlan {
    /// Notifications to create, one per recipient.
    pub notifications: Vec<NewNotification>,
    /// Feed item to broadcast to the group room, minus the excluded user.
    pub activity: Option<(GroupId, GroupActivity, Option<UserId>)>,
    /// Room change to apply before delivering.
    pub room: Option<RoomChange>,
}

impl DeliveryPlan {
    /// Whether the event produces nothing.
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.activity.is_none() && self.room.is_none()
    }
}

/// Resolves recipients and content for domain events.
#[derive(Debug, Clone)]
pub struct NotificationRules {
    groups: Arc<dyn GroupDirectory>,
}

impl NotificationRules {
    /// Creates a new rules engine.
    pub fn new(groups: Arc<dyn GroupDirectory>) -> Self {
        Self { groups }
    }

    /// Build the delivery plan for one event.
    pub async fn plan(&self, event: &DomainEvent) -> AppResult<DeliveryPlan> {
        let mut plan = DeliveryPlan::default();

        match &event.payload {
            EventPayload::Task(TaskEvent::Assigned {
                task_id,
                group_id,
                title,
                assignee_id,
                assigned_by,
                assigned_by_name,
                priority,
                due_date,
            }) => {
                if assignee_id == assigned_by {
                    return Ok(plan);
                }
                let priority = match priority {
                    TaskPriority::High | TaskPriority::Urgent => NotificationPriority::High,
                    TaskPriority::Low | TaskPriority::Medium => NotificationPriority::Normal,
                };
                plan.notifications.push(
                    NewNotification::new(
                        *assignee_id,
                        NotificationType::TaskAssigned,
                        "New task assigned",
                        format!("{assigned_by_name} assigned you \"{title}\""),
                    )
                    .with_group(*group_id)
                    .with_priority(priority)
                    .with_data(json!({
                        "task_id": task_id,
                        "task_title": title,
                        "actor": { "id": assigned_by, "name": assigned_by_name },
                        "due_date": due_date,
                        "action_url": format!("/tasks/{task_id}"),
                    })),
                );
            }

            EventPayload::Task(TaskEvent::Completed {
                task_id,
                group_id,
                title,
                completed_by,
                completed_by_name,
            }) => {
                let message = format!("{completed_by_name} completed \"{title}\"");
                for member in self.others(*group_id, &[*completed_by]).await? {
                    plan.notifications.push(
                        NewNotification::new(
                            member,
                            NotificationType::TaskCompleted,
                            "Task completed",
                            message.clone(),
                        )
                        .with_group(*group_id)
                        .with_data(json!({
                            "task_id": task_id,
                            "task_title": title,
                            "actor": { "id": completed_by, "name": completed_by_name },
                            "action_url": format!("/tasks/{task_id}"),
                        })),
                    );
                }
                plan.activity = Some((
                    *group_id,
                    GroupActivity {
                        activity_type: "task_completed".to_string(),
                        message,
                        actor: ActivityActor {
                            id: *completed_by,
                            name: completed_by_name.clone(),
                        },
                        task_id: Some(*task_id),
                        expense_id: None,
                        user_id: None,
                    },
                    Some(*completed_by),
                ));
            }

            EventPayload::Task(TaskEvent::DueSoon {
                task_id,
                group_id,
                title,
                assignee_id,
                due_date,
            }) => {
                plan.notifications.push(
                    NewNotification::new(
                        *assignee_id,
                        NotificationType::TaskDueSoon,
                        "Task due soon",
                        format!("\"{title}\" is due {}", due_date.format("%b %-d at %H:%M UTC")),
                    )
                    .with_group(*group_id)
                    .with_priority(NotificationPriority::High)
                    .with_data(json!({
                        "task_id": task_id,
                        "task_title": title,
                        "due_date": due_date,
                        "action_url": format!("/tasks/{task_id}"),
                    })),
                );
            }

            EventPayload::Expense(ExpenseEvent::Added {
                expense_id,
                group_id,
                description,
                amount_cents,
                currency,
                paid_by,
                paid_by_name,
                participants,
            }) => {
                let amount = format_amount(*amount_cents, currency);
                for participant in unique_except(participants, &[*paid_by]) {
                    plan.notifications.push(
                        NewNotification::new(
                            participant,
                            NotificationType::ExpenseAdded,
                            "New shared expense",
                            format!("{paid_by_name} added \"{description}\" ({amount})"),
                        )
                        .with_group(*group_id)
                        .with_data(json!({
                            "expense_id": expense_id,
                            "amount_cents": amount_cents,
                            "currency": currency,
                            "actor": { "id": paid_by, "name": paid_by_name },
                            "action_url": format!("/expenses/{expense_id}"),
                        })),
                    );
                }
            }

            EventPayload::Expense(ExpenseEvent::SplitPaid {
                expense_id,
                group_id,
                description,
                amount_cents,
                currency,
                paid_by,
                paid_by_name,
                creditor_id,
            }) => {
                if creditor_id == paid_by {
                    return Ok(plan);
                }
                let amount = format_amount(*amount_cents, currency);
                plan.notifications.push(
                    NewNotification::new(
                        *creditor_id,
                        NotificationType::ExpenseSplitPaid,
                        "Split paid",
                        format!("{paid_by_name} paid you {amount} for \"{description}\""),
                    )
                    .with_group(*group_id)
                    .with_data(json!({
                        "expense_id": expense_id,
                        "amount_cents": amount_cents,
                        "currency": currency,
                        "actor": { "id": paid_by, "name": paid_by_name },
                        "action_url": format!("/expenses/{expense_id}"),
                    })),
                );
            }

            EventPayload::Expense(ExpenseEvent::FullySettled {
                expense_id,
                group_id,
                description,
                amount_cents,
                currency,
                creditor_id,
                participants,
            }) => {
                let mut involved = Vec::with_capacity(participants.len() + 1);
                involved.push(*creditor_id);
                involved.extend(participants.iter().copied());
                let skip: Vec<UserId> = event.actor_id.into_iter().collect();
                let amount = format_amount(*amount_cents, currency);

                for member in unique_except(&involved, &skip) {
                    plan.notifications.push(
                        NewNotification::new(
                            member,
                            NotificationType::ExpenseSettled,
                            "Expense settled",
                            format!("\"{description}\" ({amount}) is fully settled"),
                        )
                        .with_group(*group_id)
                        .with_data(json!({
                            "expense_id": expense_id,
                            "amount_cents": amount_cents,
                            "currency": currency,
                            "action_url": format!("/expenses/{expense_id}"),
                        })),
                    );
                }
            }

            EventPayload::Group(GroupEvent::MemberJoined {
                group_id,
                group_name,
                user_id,
                user_name,
            }) => {
                plan.room = Some(RoomChange::Join {
                    group_id: *group_id,
                    user_id: *user_id,
                });
                for member in self.others(*group_id, &[*user_id]).await? {
                    plan.notifications.push(
                        NewNotification::new(
                            member,
                            NotificationType::GroupMemberJoined,
                            "New member",
                            format!("{user_name} joined {group_name}"),
                        )
                        .with_group(*group_id)
                        .with_priority(NotificationPriority::Low)
                        .with_data(json!({
                            "user_id": user_id,
                            "user_name": user_name,
                            "action_url": format!("/groups/{group_id}"),
                        })),
                    );
                }
            }

            EventPayload::Group(GroupEvent::MemberLeft {
                group_id,
                group_name,
                user_id,
                user_name,
            }) => {
                plan.room = Some(RoomChange::Leave {
                    group_id: *group_id,
                    user_id: *user_id,
                });
                for member in self.others(*group_id, &[*user_id]).await? {
                    plan.notifications.push(
                        NewNotification::new(
                            member,
                            NotificationType::GroupMemberLeft,
                            "Member left",
                            format!("{user_name} left {group_name}"),
                        )
                        .with_group(*group_id)
                        .with_priority(NotificationPriority::Low)
                        .with_data(json!({
                            "user_id": user_id,
                            "user_name": user_name,
                        })),
                    );
                }
            }

            EventPayload::Group(GroupEvent::RoleChanged {
                group_id,
                group_name,
                user_id,
                old_role,
                new_role,
                changed_by,
                changed_by_name,
            }) => {
                if user_id == changed_by {
                    return Ok(plan);
                }
                plan.notifications.push(
                    NewNotification::new(
                        *user_id,
                        NotificationType::GroupRoleChanged,
                        "Your role changed",
                        format!("{changed_by_name} made you {new_role} in {group_name}"),
                    )
                    .with_group(*group_id)
                    .with_data(json!({
                        "old_role": old_role,
                        "new_role": new_role,
                        "actor": { "id": changed_by, "name": changed_by_name },
                        "action_url": format!("/groups/{group_id}"),
                    })),
                );
            }

            EventPayload::Ai(AiEvent::TasksConfirmed {
                group_id,
                confirmed_by,
                confirmed_by_name,
                task_ids,
                task_titles,
            }) => {
                let message = match task_ids.len() {
                    1 => format!("{confirmed_by_name} added a task from the assistant"),
                    n => format!("{confirmed_by_name} added {n} tasks from the assistant"),
                };
                for member in self.others(*group_id, &[*confirmed_by]).await? {
                    plan.notifications.push(
                        NewNotification::new(
                            member,
                            NotificationType::AiTasksConfirmed,
                            "New tasks",
                            message.clone(),
                        )
                        .with_group(*group_id)
                        .with_data(json!({
                            "task_ids": task_ids,
                            "task_titles": task_titles,
                            "actor": { "id": confirmed_by, "name": confirmed_by_name },
                            "action_url": "/tasks",
                        })),
                    );
                }
            }

            EventPayload::Presence(_) | EventPayload::Notification(_) => {}
        }

        Ok(plan)
    }

    async fn others(&self, group_id: GroupId, skip: &[UserId]) -> AppResult<Vec<UserId>> {
        let members = self.groups.members(group_id).await?;
        Ok(unique_except(&members, skip))
    }
}

/// Deduplicate `ids` preserving order, dropping anything in `skip`.
fn unique_except(ids: &[UserId], skip: &[UserId]) -> Vec<UserId> {
    let mut out: Vec<UserId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !skip.contains(id) && !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nestly_core::types::id::{ExpenseId, TaskId};
    use nestly_database::memory::MemoryGroupDirectory;

    struct Household {
        rules: NotificationRules,
        group: GroupId,
        a: UserId,
        b: UserId,
        c: UserId,
    }

    fn household() -> Household {
        let directory = MemoryGroupDirectory::new();
        let group = GroupId::new();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        for user in [a, b, c] {
            directory.add_member(group, user);
        }
        Household {
            rules: NotificationRules::new(Arc::new(directory)),
            group,
            a,
            b,
            c,
        }
    }

    fn recipients(plan: &DeliveryPlan) -> Vec<UserId> {
        plan.notifications.iter().map(|n| n.recipient_id).collect()
    }

    fn assigned(h: &Household, assignee: UserId, by: UserId, priority: TaskPriority) -> DomainEvent {
        DomainEvent::new(
            Some(by),
            EventPayload::Task(TaskEvent::Assigned {
                task_id: TaskId::new(),
                group_id: h.group,
                title: "Clean kitchen".to_string(),
                assignee_id: assignee,
                assigned_by: by,
                assigned_by_name: "Bo".to_string(),
                priority,
                due_date: None,
            }),
        )
    }

    #[tokio::test]
    async fn test_task_assigned_priority_mapping() {
        let h = household();
        let plan = h.rules.plan(&assigned(&h, h.a, h.b, TaskPriority::Urgent)).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.a]);
        assert_eq!(plan.notifications[0].priority, NotificationPriority::High);
        assert_eq!(plan.notifications[0].notification_type, NotificationType::TaskAssigned);
        assert!(plan.notifications[0].message.contains("Clean kitchen"));

        let plan = h.rules.plan(&assigned(&h, h.a, h.b, TaskPriority::Low)).await.unwrap();
        assert_eq!(plan.notifications[0].priority, NotificationPriority::Normal);
    }

    #[tokio::test]
    async fn test_self_assignment_is_skipped() {
        let h = household();
        let plan = h.rules.plan(&assigned(&h, h.a, h.a, TaskPriority::High)).await.unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_task_completed_notifies_others_and_broadcasts() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.b),
            EventPayload::Task(TaskEvent::Completed {
                task_id: TaskId::new(),
                group_id: h.group,
                title: "Laundry".to_string(),
                completed_by: h.b,
                completed_by_name: "Bo".to_string(),
            }),
        );
        let plan = h.rules.plan(&event).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.a, h.c]);

        let (group, activity, exclude) = plan.activity.unwrap();
        assert_eq!(group, h.group);
        assert_eq!(exclude, Some(h.b));
        assert_eq!(activity.activity_type, "task_completed");
    }

    #[tokio::test]
    async fn test_expense_added_skips_payer_and_dedups() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.a),
            EventPayload::Expense(ExpenseEvent::Added {
                expense_id: ExpenseId::new(),
                group_id: h.group,
                description: "Groceries".to_string(),
                amount_cents: 4250,
                currency: "EUR".to_string(),
                paid_by: h.a,
                paid_by_name: "Ada".to_string(),
                participants: vec![h.a, h.b, h.c, h.b],
            }),
        );
        let plan = h.rules.plan(&event).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.b, h.c]);
        assert!(plan.notifications[0].message.contains("42.50 EUR"));
    }

    #[tokio::test]
    async fn test_split_paid_to_self_is_skipped() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.a),
            EventPayload::Expense(ExpenseEvent::SplitPaid {
                expense_id: ExpenseId::new(),
                group_id: h.group,
                description: "Rent".to_string(),
                amount_cents: 100,
                currency: "EUR".to_string(),
                paid_by: h.a,
                paid_by_name: "Ada".to_string(),
                creditor_id: h.a,
            }),
        );
        assert!(h.rules.plan(&event).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fully_settled_skips_actor() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.c),
            EventPayload::Expense(ExpenseEvent::FullySettled {
                expense_id: ExpenseId::new(),
                group_id: h.group,
                description: "Internet".to_string(),
                amount_cents: 3000,
                currency: "EUR".to_string(),
                creditor_id: h.a,
                participants: vec![h.b, h.c],
            }),
        );
        let plan = h.rules.plan(&event).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.a, h.b]);
        assert!(
            plan.notifications
                .iter()
                .all(|n| n.notification_type == NotificationType::ExpenseSettled)
        );
    }

    #[tokio::test]
    async fn test_member_joined_low_priority_and_room_join() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.c),
            EventPayload::Group(GroupEvent::MemberJoined {
                group_id: h.group,
                group_name: "Flat 3B".to_string(),
                user_id: h.c,
                user_name: "Cy".to_string(),
            }),
        );
        let plan = h.rules.plan(&event).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.a, h.b]);
        assert!(plan.notifications.iter().all(|n| n.priority == NotificationPriority::Low));
        assert_eq!(
            plan.room,
            Some(RoomChange::Join {
                group_id: h.group,
                user_id: h.c
            })
        );
    }

    #[tokio::test]
    async fn test_role_change_by_self_is_skipped() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.a),
            EventPayload::Group(GroupEvent::RoleChanged {
                group_id: h.group,
                group_name: "Flat 3B".to_string(),
                user_id: h.a,
                old_role: "member".to_string(),
                new_role: "admin".to_string(),
                changed_by: h.a,
                changed_by_name: "Ada".to_string(),
            }),
        );
        assert!(h.rules.plan(&event).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_soon_is_high_priority() {
        let h = household();
        let event = DomainEvent::new(
            None,
            EventPayload::Task(TaskEvent::DueSoon {
                task_id: TaskId::new(),
                group_id: h.group,
                title: "Bins".to_string(),
                assignee_id: h.b,
                due_date: Utc::now(),
            }),
        );
        let plan = h.rules.plan(&event).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.b]);
        assert_eq!(plan.notifications[0].priority, NotificationPriority::High);
    }

    #[tokio::test]
    async fn test_ai_tasks_confirmed_notifies_others() {
        let h = household();
        let event = DomainEvent::new(
            Some(h.a),
            EventPayload::Ai(AiEvent::TasksConfirmed {
                group_id: h.group,
                confirmed_by: h.a,
                confirmed_by_name: "Ada".to_string(),
                task_ids: vec![TaskId::new(), TaskId::new()],
                task_titles: vec!["Mop".to_string(), "Dust".to_string()],
            }),
        );
        let plan = h.rules.plan(&event).await.unwrap();
        assert_eq!(recipients(&plan), vec![h.b, h.c]);
        assert!(plan.notifications[0].message.contains("2 tasks"));
    }
}
