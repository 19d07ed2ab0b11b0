//! Item registry HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::AuthenticatedUser;
use crate::item::{CreateItemRequest, Item, ListItemsQuery};
use crate::state::AppState;

/// POST /api/items - List a new item
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = state.item_service.create_item(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/items - Browse available items
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.item_service.list_items(query).await?;
    Ok(Json(items))
}

/// GET /api/items/:id - Fetch a single item
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    let item = state.item_service.get_item(id).await?;
    Ok(Json(item))
}

/// DELETE /api/items/:id - Delist an item (owner only)
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    let item = state.item_service.remove_item(user.user_id, id).await?;
    Ok(Json(item))
}
