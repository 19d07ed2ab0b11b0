//! Notification HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::{AuthenticatedUser, PageQuery};
use crate::notification::Notification;
use crate::state::AppState;

/// GET /api/notifications - The caller's notification feed
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state
        .notification_service
        .list(user.user_id, page.page(), page.limit())
        .await?;

    Ok(Json(notifications))
}

/// PUT /api/notifications/:id/read - Mark a notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .notification_service
        .mark_read(user.user_id, id)
        .await?;

    Ok(Json(notification))
}
