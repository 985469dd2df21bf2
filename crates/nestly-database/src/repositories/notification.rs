//! Notification store backed by PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use nestly_core::error::{AppError, ErrorKind};
use nestly_core::result::AppResult;
use nestly_core::types::id::{GroupId, NotificationId, UserId};
use nestly_core::types::pagination::PageResponse;
use nestly_entity::notification::{ChannelDelivery, DeliveryChannel, DeliveryStatus, Notification};

use crate::store::{NotificationQuery, NotificationStore};

const VISIBLE: &str = "recipient_id = $1 AND expires_at > $2 AND dismissed_at IS NULL";

/// Row shape of the `notifications` table.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    group_id: Option<Uuid>,
    notification_type: String,
    title: String,
    message: String,
    data: serde_json::Value,
    priority: String,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    delivery_status: Json<DeliveryStatus>,
    is_snoozed: bool,
    snoozed_until: Option<DateTime<Utc>>,
    snooze_count: i32,
    is_batched: bool,
    batch_count: i32,
    batched_notifications: Vec<Uuid>,
    batch_parent: Option<Uuid>,
    clicked_at: Option<DateTime<Utc>>,
    dismissed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let notification_type = row
            .notification_type
            .parse()
            .map_err(|e: String| AppError::new(ErrorKind::Database, e))?;
        let priority = row
            .priority
            .parse()
            .map_err(|e: String| AppError::new(ErrorKind::Database, e))?;

        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            recipient_id: UserId::from_uuid(row.recipient_id),
            group_id: row.group_id.map(GroupId::from_uuid),
            notification_type,
            title: row.title,
            message: row.message,
            data: row.data,
            priority,
            is_read: row.is_read,
            read_at: row.read_at,
            delivery_status: row.delivery_status.0,
            is_snoozed: row.is_snoozed,
            snoozed_until: row.snoozed_until,
            snooze_count: row.snooze_count,
            is_batched: row.is_batched,
            batch_count: row.batch_count,
            batched_notifications: row
                .batched_notifications
                .into_iter()
                .map(NotificationId::from_uuid)
                .collect(),
            batch_parent: row.batch_parent.map(NotificationId::from_uuid),
            clicked_at: row.clicked_at,
            dismissed_at: row.dismissed_at,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

fn convert(row: Option<NotificationRow>) -> AppResult<Option<Notification>> {
    row.map(Notification::try_from).transpose()
}

/// Notification store over a `sqlx` pool.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Create a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, n: &Notification) -> AppResult<Notification> {
        let batched: Vec<Uuid> = n.batched_notifications.iter().map(|id| id.into_uuid()).collect();
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (id, recipient_id, group_id, notification_type, title, message, data, \
             priority, is_read, read_at, delivery_status, is_snoozed, snoozed_until, snooze_count, \
             is_batched, batch_count, batched_notifications, batch_parent, clicked_at, dismissed_at, \
             created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22) \
             RETURNING *",
        )
        .bind(n.id.into_uuid())
        .bind(n.recipient_id.into_uuid())
        .bind(n.group_id.map(GroupId::into_uuid))
        .bind(n.notification_type.as_str())
        .bind(&n.title)
        .bind(&n.message)
        .bind(&n.data)
        .bind(n.priority.as_str())
        .bind(n.is_read)
        .bind(n.read_at)
        .bind(Json(&n.delivery_status))
        .bind(n.is_snoozed)
        .bind(n.snoozed_until)
        .bind(n.snooze_count)
        .bind(n.is_batched)
        .bind(n.batch_count)
        .bind(batched)
        .bind(n.batch_parent.map(NotificationId::into_uuid))
        .bind(n.clicked_at)
        .bind(n.dismissed_at)
        .bind(n.created_at)
        .bind(n.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to create notification"))?;

        Notification::try_from(row)
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find notification"))?;

        convert(row)
    }

    async fn list(
        &self,
        recipient: UserId,
        query: &NotificationQuery,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<Notification>> {
        let filters = "AND ($3::boolean = FALSE OR is_read = FALSE) \
             AND ($4::text IS NULL OR notification_type = $4) \
             AND ($5::uuid IS NULL OR group_id = $5) \
             AND ($6::boolean OR is_snoozed = FALSE OR snoozed_until <= $2)";
        let notification_type = query.notification_type.map(|t| t.as_str());
        let group_id = query.group_id.map(GroupId::into_uuid);

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM notifications WHERE {VISIBLE} {filters}"))
                .bind(recipient.into_uuid())
                .bind(now)
                .bind(query.unread_only)
                .bind(notification_type)
                .bind(group_id)
                .bind(query.include_snoozed)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err("Failed to count notifications"))?;

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT * FROM notifications WHERE {VISIBLE} {filters} \
             ORDER BY created_at DESC LIMIT $7 OFFSET $8"
        ))
        .bind(recipient.into_uuid())
        .bind(now)
        .bind(query.unread_only)
        .bind(notification_type)
        .bind(group_id)
        .bind(query.include_snoozed)
        .bind(i64::try_from(query.page.limit()).unwrap_or(i64::MAX))
        .bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list notifications"))?;

        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PageResponse::for_request(items, &query.page, total as u64))
    }

    async fn count(
        &self,
        recipient: UserId,
        unread_only: bool,
        group_id: Option<GroupId>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notifications WHERE {VISIBLE} \
             AND ($3::boolean = FALSE OR is_read = FALSE) \
             AND ($4::uuid IS NULL OR group_id = $4) \
             AND (is_snoozed = FALSE OR snoozed_until <= $2)"
        ))
        .bind(recipient.into_uuid())
        .bind(now)
        .bind(unread_only)
        .bind(group_id.map(GroupId::into_uuid))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count notifications"))?;

        Ok(total as u64)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET is_read = TRUE, read_at = $3 \
             WHERE id = $1 AND recipient_id = $2 AND is_read = FALSE AND expires_at > $3 \
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(recipient.into_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to mark notification read"))?;

        convert(row)
    }

    async fn mark_all_read(
        &self,
        recipient: UserId,
        group_id: Option<GroupId>,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE recipient_id = $1 AND is_read = FALSE AND expires_at > $2 \
             AND ($3::uuid IS NULL OR group_id = $3)",
        )
        .bind(recipient.into_uuid())
        .bind(at)
        .bind(group_id.map(GroupId::into_uuid))
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to mark all notifications read"))?;

        Ok(result.rows_affected())
    }

    async fn snooze(
        &self,
        id: NotificationId,
        recipient: UserId,
        until: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET is_snoozed = TRUE, snoozed_until = $3, snooze_count = snooze_count + 1 \
             WHERE id = $1 AND recipient_id = $2 AND expires_at > NOW() \
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(recipient.into_uuid())
        .bind(until)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to snooze notification"))?;

        convert(row)
    }

    async fn unsnooze(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET is_snoozed = FALSE, snoozed_until = NULL \
             WHERE id = $1 AND recipient_id = $2 AND expires_at > NOW() \
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(recipient.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to unsnooze notification"))?;

        convert(row)
    }

    async fn sweep_expired_snoozes(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_snoozed = FALSE, snoozed_until = NULL \
             WHERE is_snoozed = TRUE AND snoozed_until <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to sweep snoozed notifications"))?;

        Ok(result.rows_affected())
    }

    async fn mark_clicked(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET clicked_at = COALESCE(clicked_at, $3) \
             WHERE id = $1 AND recipient_id = $2 AND expires_at > $3 \
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(recipient.into_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to record notification click"))?;

        convert(row)
    }

    async fn mark_dismissed(
        &self,
        id: NotificationId,
        recipient: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET dismissed_at = COALESCE(dismissed_at, $3) \
             WHERE id = $1 AND recipient_id = $2 AND expires_at > $3 \
             RETURNING *",
        )
        .bind(id.into_uuid())
        .bind(recipient.into_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to dismiss notification"))?;

        convert(row)
    }

    async fn delete(&self, id: NotificationId, recipient: UserId) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE id = $1 AND recipient_id = $2 AND expires_at > NOW()",
        )
        .bind(id.into_uuid())
        .bind(recipient.into_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to delete notification"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_channel_delivery(
        &self,
        id: NotificationId,
        channel: DeliveryChannel,
        outcome: &ChannelDelivery,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET delivery_status = jsonb_set(delivery_status, ARRAY[$2::text], $3::jsonb, TRUE) \
             WHERE id = $1",
        )
        .bind(id.into_uuid())
        .bind(channel.as_str())
        .bind(Json(outcome))
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to record delivery outcome"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to purge expired notifications"))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestly_entity::notification::{NotificationPriority, NotificationType};

    fn row() -> NotificationRow {
        let now = Utc::now();
        NotificationRow {
            id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            group_id: None,
            notification_type: "EXPENSE_SETTLED".to_string(),
            title: "Settled".to_string(),
            message: "Groceries is settled".to_string(),
            data: serde_json::json!({ "expense_id": Uuid::new_v4() }),
            priority: "low".to_string(),
            is_read: false,
            read_at: None,
            delivery_status: Json(DeliveryStatus::default()),
            is_snoozed: false,
            snoozed_until: None,
            snooze_count: 0,
            is_batched: false,
            batch_count: 0,
            batched_notifications: Vec::new(),
            batch_parent: None,
            clicked_at: None,
            dismissed_at: None,
            created_at: now,
            expires_at: now + chrono::Duration::days(30),
        }
    }

    #[test]
    fn test_row_conversion() {
        let n = Notification::try_from(row()).unwrap();
        assert_eq!(n.notification_type, NotificationType::ExpenseSettled);
        assert_eq!(n.priority, NotificationPriority::Low);
    }

    #[test]
    fn test_row_with_unknown_type_is_database_error() {
        let mut r = row();
        r.notification_type = "FILE_UPLOADED".to_string();
        let err = Notification::try_from(r).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
    }
}
