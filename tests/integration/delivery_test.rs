//! Integration tests for event-driven notification delivery.

use nestly_core::events::{EventPayload, ExpenseEvent, TaskEvent, TaskPriority};
use nestly_core::types::id::{ExpenseId, TaskId, UserId};
use nestly_database::NotificationQuery;
use nestly_entity::notification::{NotificationPriority, NotificationType};
use nestly_realtime::OutboundMessage;

use crate::helpers::{TestApp, assert_silent, next_message};

fn assignment(
    group: nestly_core::types::id::GroupId,
    assignee: UserId,
    assigner: UserId,
    priority: TaskPriority,
) -> EventPayload {
    EventPayload::Task(TaskEvent::Assigned {
        task_id: TaskId::new(),
        group_id: group,
        title: "Descale the kettle".to_string(),
        assignee_id: assignee,
        assigned_by: assigner,
        assigned_by_name: "Ada".to_string(),
        priority,
        due_date: None,
    })
}

#[tokio::test]
async fn test_connected_assignee_receives_task_assigned() {
    let app = TestApp::new();
    let (group, members) = app.household(2);
    let (assigner, assignee) = (members[0], members[1]);
    let mut rx = app.connect(assignee, Some(group));

    app.publish(
        Some(assigner),
        assignment(group, assignee, assigner, TaskPriority::High),
    )
    .await;

    let envelope = next_message(&mut rx).await;
    let pushed = match envelope.message {
        OutboundMessage::NotificationNew(notification) => notification,
        other => panic!("expected notification:new, got {}", other.event_name()),
    };
    assert!(pushed.message.contains("Descale the kettle"));

    let page = app
        .service
        .list(assignee, NotificationQuery::page(1, 20))
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    let stored = &page.items[0];
    assert_eq!(stored.id, pushed.id);
    assert_eq!(stored.notification_type, NotificationType::TaskAssigned);
    assert_eq!(stored.priority, NotificationPriority::High);
    assert!(!stored.is_read);
    assert!(stored.delivery_status.realtime.delivered);
    assert!(stored.delivery_status.realtime.delivered_at.is_some());
    assert_silent(&mut rx);
}

#[tokio::test]
async fn test_disconnected_assignee_gets_stored_notification() {
    let app = TestApp::new();
    let (group, members) = app.household(2);
    let (assigner, assignee) = (members[0], members[1]);

    app.publish(
        Some(assigner),
        assignment(group, assignee, assigner, TaskPriority::Medium),
    )
    .await;

    let page = app
        .service
        .list(assignee, NotificationQuery::page(1, 20))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(!page.items[0].delivery_status.realtime.delivered);
    assert_eq!(page.items[0].priority, NotificationPriority::Normal);
    assert_eq!(app.service.count(assignee, true, None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_self_assignment_creates_nothing() {
    let app = TestApp::new();
    let (group, members) = app.household(1);
    let user = members[0];

    app.publish(Some(user), assignment(group, user, user, TaskPriority::Urgent))
        .await;

    assert_eq!(app.service.count(user, false, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_expense_added_reaches_participants_only() {
    let app = TestApp::new();
    let (group, members) = app.household(3);
    let (payer, a, b) = (members[0], members[1], members[2]);
    let mut payer_rx = app.connect(payer, Some(group));
    let mut a_rx = app.connect(a, Some(group));

    app.publish(
        Some(payer),
        EventPayload::Expense(ExpenseEvent::Added {
            expense_id: ExpenseId::new(),
            group_id: group,
            description: "Weekly groceries".to_string(),
            amount_cents: 8_940,
            currency: "EUR".to_string(),
            paid_by: payer,
            paid_by_name: "Ada".to_string(),
            participants: vec![payer, a, b],
        }),
    )
    .await;

    let envelope = next_message(&mut a_rx).await;
    assert_eq!(envelope.message.event_name(), "notification:new");
    assert_silent(&mut payer_rx);

    for user in [a, b] {
        let page = app
            .service
            .list(user, NotificationQuery::page(1, 20))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].notification_type, NotificationType::ExpenseAdded);
        assert!(page.items[0].message.contains("89.40 EUR"));
    }
    assert_eq!(app.service.count(payer, false, None).await.unwrap(), 0);
}
