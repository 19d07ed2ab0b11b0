//! Wallet and credit route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/sign-in", post(sign_in))
        .route("/api/wallet/recharge", post(recharge))
        .route("/api/wallet/transactions", get(list_transactions))
        .route("/api/wallet/credit", get(get_credit))
        .route("/api/wallet/credit/records", get(list_credit_records))
}
