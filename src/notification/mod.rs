//! Trade notifications
//!
//! Fire-and-forget rows written in the same transaction as the operation
//! that produced them. Delivery (push, email) is an external collaborator;
//! the engine only guarantees the record exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;

/// Notification model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Trade,
}

#[derive(Clone)]
pub struct NotificationService {
    db_pool: PgPool,
}

impl NotificationService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Emit a trade notification inside the caller's transaction.
    pub async fn notify_trade(
        conn: &mut PgConnection,
        recipient_id: Uuid,
        title: &str,
        body: &str,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, body, related_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recipient_id)
        .bind(NotificationKind::Trade)
        .bind(title)
        .bind(body)
        .bind(trade_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Paginated notification feed, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        page: i32,
        limit: i32,
    ) -> Result<Vec<Notification>, ApiError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(notifications)
    }

    /// Mark a notification as read. Recipient only.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification, ApiError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

        Ok(notification)
    }
}
