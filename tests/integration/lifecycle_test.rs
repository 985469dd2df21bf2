//! Integration tests for notification lifecycle operations.

use chrono::{Duration, Utc};

use nestly_core::error::ErrorKind;
use nestly_core::traits::DeliveryOutcome;
use nestly_core::types::id::{GroupId, UserId};
use nestly_database::NotificationQuery;
use nestly_entity::notification::{DeliveryChannel, NewNotification, NotificationType};
use nestly_realtime::OutboundMessage;
use nestly_service::ReadOutcome;

use crate::helpers::{TestApp, assert_silent, next_message};

fn system(user: UserId) -> NewNotification {
    NewNotification::new(user, NotificationType::System, "Heads up", "Water off 9-11")
}

#[tokio::test]
async fn test_mark_read_is_idempotent_and_echoed_once() {
    let app = TestApp::new();
    let user = UserId::new();
    let created = app.service.create_and_deliver(system(user)).await.unwrap();
    let mut rx = app.connect(user, None);

    assert_eq!(
        app.service.mark_read(created.id, user).await.unwrap(),
        ReadOutcome::Marked
    );
    let echo = next_message(&mut rx).await;
    assert!(matches!(
        echo.message,
        OutboundMessage::NotificationRead { notification_id, .. } if notification_id == created.id
    ));

    assert_eq!(
        app.service.mark_read(created.id, user).await.unwrap(),
        ReadOutcome::AlreadyRead
    );
    assert_silent(&mut rx);

    let page = app
        .service
        .list(user, NotificationQuery::page(1, 20))
        .await
        .unwrap();
    for n in &page.items {
        assert_eq!(n.is_read, n.read_at.is_some());
    }
    assert!(page.items[0].is_read);
}

#[tokio::test]
async fn test_foreign_notification_is_not_found() {
    let app = TestApp::new();
    let (owner, intruder) = (UserId::new(), UserId::new());
    let created = app.service.create_and_deliver(system(owner)).await.unwrap();

    for err in [
        app.service.mark_read(created.id, intruder).await.unwrap_err(),
        app.service.delete(created.id, intruder).await.unwrap_err(),
        app.service
            .snooze(created.id, intruder, Utc::now() + Duration::hours(1))
            .await
            .unwrap_err(),
    ] {
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
    assert_eq!(app.service.count(owner, true, None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_mark_all_read_scoped_to_group() {
    let app = TestApp::new();
    let user = UserId::new();
    let (home, work) = (GroupId::new(), GroupId::new());
    for group in [home, home, work] {
        app.service
            .create_and_deliver(system(user).with_group(group))
            .await
            .unwrap();
    }
    let mut rx = app.connect(user, None);

    assert_eq!(app.service.mark_all_read(user, Some(home)).await.unwrap(), 2);
    match next_message(&mut rx).await.message {
        OutboundMessage::NotificationAllRead { count, group_id } => {
            assert_eq!(count, 2);
            assert_eq!(group_id, Some(home));
        }
        other => panic!("expected notification:all_read, got {}", other.event_name()),
    }
    assert_eq!(app.service.count(user, true, None).await.unwrap(), 1);

    // Nothing left in `home`: no echo.
    assert_eq!(app.service.mark_all_read(user, Some(home)).await.unwrap(), 0);
    assert_silent(&mut rx);
}

#[tokio::test]
async fn test_snooze_hides_until_sweep() {
    let app = TestApp::new();
    let user = UserId::new();
    let created = app.service.create_and_deliver(system(user)).await.unwrap();

    let snoozed = app
        .service
        .snooze(created.id, user, Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    assert!(snoozed.is_snoozed);
    assert_eq!(snoozed.snooze_count, 1);

    let visible = app
        .service
        .list(user, NotificationQuery::page(1, 20))
        .await
        .unwrap();
    assert!(visible.items.is_empty());

    let mut with_snoozed = NotificationQuery::page(1, 20);
    with_snoozed.include_snoozed = true;
    assert_eq!(app.service.list(user, with_snoozed).await.unwrap().items.len(), 1);

    // Re-snooze into the past, then sweep.
    app.service
        .snooze(created.id, user, Utc::now() - Duration::milliseconds(1))
        .await
        .unwrap();
    assert_eq!(app.service.sweep_expired_snoozes().await.unwrap(), 1);
    assert_eq!(app.service.sweep_expired_snoozes().await.unwrap(), 0);

    let page = app
        .service
        .list(user, NotificationQuery::page(1, 20))
        .await
        .unwrap();
    assert!(!page.items[0].is_snoozed);
    assert!(page.items[0].snoozed_until.is_none());
    assert_eq!(page.items[0].snooze_count, 2);
}

#[tokio::test]
async fn test_click_dismiss_delete_and_channel_outcome() {
    let app = TestApp::new();
    let user = UserId::new();
    let kept = app.service.create_and_deliver(system(user)).await.unwrap();
    let dismissed = app.service.create_and_deliver(system(user)).await.unwrap();
    let deleted = app.service.create_and_deliver(system(user)).await.unwrap();

    let clicked = app.service.click(kept.id, user).await.unwrap();
    assert!(clicked.clicked_at.is_some());
    assert!(!clicked.is_read);

    app.service
        .record_channel_delivery(
            kept.id,
            DeliveryChannel::Email,
            &DeliveryOutcome::Sent {
                message_id: "msg-7".to_string(),
            },
        )
        .await
        .unwrap();

    app.service.dismiss(dismissed.id, user).await.unwrap();

    let mut rx = app.connect(user, None);
    app.service.delete(deleted.id, user).await.unwrap();
    assert_eq!(
        next_message(&mut rx).await.message.event_name(),
        "notification:deleted"
    );
    assert_eq!(
        app.service.delete(deleted.id, user).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    let page = app
        .service
        .list(user, NotificationQuery::page(1, 20))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    let email = &page.items[0].delivery_status.email;
    assert!(email.delivered);
    assert_eq!(email.message_id.as_deref(), Some("msg-7"));
    assert!(!page.items[0].delivery_status.push.delivered);
}

#[tokio::test]
async fn test_invalid_draft_is_rejected_before_persistence() {
    let app = TestApp::new();
    let user = UserId::new();

    let err = app
        .service
        .create_and_deliver(NewNotification::new(
            user,
            NotificationType::System,
            "",
            "Body",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = app
        .service
        .create_and_deliver(system(UserId::from_uuid(uuid::Uuid::nil())))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert_eq!(app.service.count(user, false, None).await.unwrap(), 0);
}
