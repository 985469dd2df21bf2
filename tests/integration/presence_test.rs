//! Integration tests for group rooms and session tracking.

use std::sync::Arc;

use nestly_core::events::{EventPayload, GroupEvent, TaskEvent};
use nestly_core::types::id::{GroupId, TaskId, UserId};
use nestly_realtime::{ConnectionHandle, OutboundMessage, UserSnapshot};

use crate::helpers::{TestApp, assert_silent, next_message};

#[tokio::test]
async fn test_task_completed_broadcasts_to_everyone_but_completer() {
    let app = TestApp::new();
    let (group, members) = app.household(3);
    let (a, b, c) = (members[0], members[1], members[2]);
    let mut a_rx = app.connect(a, Some(group));
    let mut b_rx = app.connect(b, Some(group));
    let mut c_rx = app.connect(c, Some(group));

    app.publish(
        Some(b),
        EventPayload::Task(TaskEvent::Completed {
            task_id: TaskId::new(),
            group_id: group,
            title: "Hoover the stairs".to_string(),
            completed_by: b,
            completed_by_name: "Bo".to_string(),
        }),
    )
    .await;

    for rx in [&mut a_rx, &mut c_rx] {
        let envelope = next_message(rx).await;
        match envelope.message {
            OutboundMessage::GroupActivity(activity) => {
                assert_eq!(activity.activity_type, "task_completed");
                assert_eq!(activity.actor.id, b);
            }
            other => panic!("expected group_activity, got {}", other.event_name()),
        }
        let envelope = next_message(rx).await;
        assert_eq!(envelope.message.event_name(), "notification:new");
        assert_silent(rx);
    }
    assert_silent(&mut b_rx);
}

#[tokio::test]
async fn test_member_join_and_leave_refresh_rooms() {
    let app = TestApp::new();
    let (group, members) = app.household(1);
    let existing = members[0];
    let newcomer = UserId::new();
    let _existing_rx = app.connect(existing, Some(group));
    let _newcomer_rx = app.connect(newcomer, None);

    app.directory.add_member(group, newcomer);
    app.publish(
        Some(newcomer),
        EventPayload::Group(GroupEvent::MemberJoined {
            group_id: group,
            group_name: "Flat 3B".to_string(),
            user_id: newcomer,
            user_name: "Cy".to_string(),
        }),
    )
    .await;

    let mut room = app.registry.room_members(group);
    room.sort();
    let mut expected = vec![existing, newcomer];
    expected.sort();
    assert_eq!(room, expected);

    app.directory.remove_member(group, newcomer);
    app.publish(
        Some(newcomer),
        EventPayload::Group(GroupEvent::MemberLeft {
            group_id: group,
            group_name: "Flat 3B".to_string(),
            user_id: newcomer,
            user_name: "Cy".to_string(),
        }),
    )
    .await;

    assert_eq!(app.registry.room_members(group), vec![existing]);
    // joined + left
    assert_eq!(app.service.count(existing, true, Some(group)).await.unwrap(), 2);
}

#[tokio::test]
async fn test_user_stays_online_until_last_session_closes() {
    let app = TestApp::new();
    let user = UserId::new();
    let group = GroupId::new();

    let handles: Vec<Arc<ConnectionHandle>> = (0..3)
        .map(|_| Arc::new(ConnectionHandle::channel(8).0))
        .collect();
    for handle in &handles {
        app.registry
            .register(UserSnapshot::new(user, Some(group)), Arc::clone(handle));
    }

    assert!(app.registry.unregister(handles[2].id()).is_none());
    assert!(app.registry.unregister(handles[0].id()).is_none());
    assert!(app.registry.is_online(user));
    assert_eq!(app.registry.stats().connections, 1);

    match app.registry.unregister(handles[1].id()) {
        Some(OutboundMessage::UserOffline { user_id, group_id }) => {
            assert_eq!(user_id, user);
            assert_eq!(group_id, Some(group));
        }
        other => panic!("expected user:offline, got {other:?}"),
    }
    assert!(!app.registry.is_online(user));
    assert!(app.registry.room_members(group).is_empty());
}

#[tokio::test]
async fn test_send_to_offline_user_is_a_no_op() {
    let app = TestApp::new();
    let user = UserId::new();

    let delivered = app.registry.send_to_user(
        user,
        OutboundMessage::NotificationAllRead {
            count: 1,
            group_id: None,
        },
    );

    assert!(!delivered);
    assert_eq!(app.registry.stats().connections, 0);
}
