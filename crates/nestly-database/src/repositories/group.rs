//! Group membership lookups against the `group_members` projection.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use nestly_core::error::{AppError, ErrorKind};
use nestly_core::result::AppResult;
use nestly_core::types::id::{GroupId, UserId};

use crate::store::GroupDirectory;

/// Group directory backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgGroupDirectory {
    pool: PgPool,
}

impl PgGroupDirectory {
    /// Create a new directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupDirectory for PgGroupDirectory {
    async fn members(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM group_members WHERE group_id = $1 ORDER BY joined_at",
        )
        .bind(group_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list group members", e))?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    async fn group_of(&self, user_id: UserId) -> AppResult<Option<GroupId>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT group_id FROM group_members WHERE user_id = $1 ORDER BY joined_at DESC LIMIT 1",
        )
        .bind(user_id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user group", e))?;

        Ok(id.map(GroupId::from_uuid))
    }
}
