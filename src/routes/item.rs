//! Item route definitions

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", post(create_item))
        .route("/api/items", get(list_items))
        .route("/api/items/:id", get(get_item))
        .route("/api/items/:id", delete(remove_item))
}
