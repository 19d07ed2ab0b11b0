//! Credit-relevant slice of the user directory.
//!
//! Registration, profiles and sessions belong to the auth collaborator; the
//! trade engine only needs a user's identity and running credit score.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;

/// User row as seen by the trade engine
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub credit_score: i32,
    pub created_at: DateTime<Utc>,
}

/// Compact user projection embedded in trade responses
#[derive(Debug, Serialize, Clone)]
pub struct UserBrief {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for UserBrief {
    fn from(user: User) -> Self {
        UserBrief {
            id: user.id,
            username: user.username,
        }
    }
}

/// Fetch a user within an open transaction.
pub async fn get_user(conn: &mut PgConnection, id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT id, username, credit_score, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Fetch a user with a row lock, for operations that mutate the credit score.
pub async fn get_user_for_update(conn: &mut PgConnection, id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, credit_score, created_at FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Pool-level lookup for read-only projections.
pub async fn fetch_user(pool: &PgPool, id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT id, username, credit_score, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
