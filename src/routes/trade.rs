//! Trade route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn trade_routes() -> Router<AppState> {
    Router::new()
        .route("/api/trades", post(create_trade))
        .route("/api/trades/sent", get(list_sent_trades))
        .route("/api/trades/received", get(list_received_trades))
        .route("/api/trades/deposit-quote", get(deposit_quote))
        .route("/api/trades/:id", get(get_trade))
        .route("/api/trades/:id/status", put(update_trade_status))
        .route("/api/trades/:id/deposit", post(pay_trade_deposit))
        .route("/api/trades/:id/ship", post(ship_trade_item))
}
