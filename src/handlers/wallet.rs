//! Wallet and credit HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::credit::{CreditRecord, CreditSummary};
use crate::error::ApiError;
use crate::handlers::{AuthenticatedUser, PageQuery};
use crate::state::AppState;
use crate::wallet::{RechargeRequest, WalletSummary, WalletTransaction};

/// GET /api/wallet - Balances, frozen funds and sign-in streak
pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<WalletSummary>, ApiError> {
    let summary = state.wallet_service.wallet_summary(user.user_id).await?;
    Ok(Json(summary))
}

/// POST /api/wallet/sign-in - Claim the daily sign-in reward
pub async fn sign_in(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<WalletTransaction>, ApiError> {
    let transaction = state.wallet_service.sign_in(user.user_id).await?;
    Ok(Json(transaction))
}

/// POST /api/wallet/recharge - Recharge stub (no payment gateway)
pub async fn recharge(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<RechargeRequest>,
) -> Result<Json<WalletTransaction>, ApiError> {
    let transaction = state
        .wallet_service
        .recharge(user.user_id, req.amount)
        .await?;

    Ok(Json(transaction))
}

/// GET /api/wallet/transactions - Ledger history, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<WalletTransaction>>, ApiError> {
    let transactions = state
        .wallet_service
        .transactions(user.user_id, page.page(), page.limit())
        .await?;

    Ok(Json(transactions))
}

/// GET /api/wallet/credit - Credit standing and trading privileges
pub async fn get_credit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CreditSummary>, ApiError> {
    let summary = state.credit_service.credit_summary(user.user_id).await?;
    Ok(Json(summary))
}

/// GET /api/wallet/credit/records - Credit history, newest first
pub async fn list_credit_records(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<CreditRecord>>, ApiError> {
    let records = state
        .credit_service
        .credit_records(user.user_id, page.page(), page.limit())
        .await?;

    Ok(Json(records))
}
