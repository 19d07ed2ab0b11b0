//! Trade lifecycle HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::handlers::{AuthenticatedUser, PageQuery};
use crate::state::AppState;
use crate::trade::{
    CreateTradeRequest, DepositQuote, ShipRequest, TradeResponse, UpdateStatusRequest,
};

/// POST /api/trades - Create a trade request
pub async fn create_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateTradeRequest>,
) -> Result<(StatusCode, Json<TradeResponse>), ApiError> {
    let trade = state
        .trade_service
        .create_trade_request(user.user_id, req)
        .await?;

    Ok((StatusCode::CREATED, Json(trade)))
}

/// GET /api/trades/:id - Fetch a single trade request (parties only)
pub async fn get_trade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade = state.trade_service.get_trade(id, user.user_id).await?;
    Ok(Json(trade))
}

/// GET /api/trades/sent - Requests the caller initiated
pub async fn list_sent_trades(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<TradeResponse>>, ApiError> {
    let trades = state
        .trade_service
        .list_sent(user.user_id, page.page(), page.limit())
        .await?;

    Ok(Json(trades))
}

/// GET /api/trades/received - Requests targeting the caller's items
pub async fn list_received_trades(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<TradeResponse>>, ApiError> {
    let trades = state
        .trade_service
        .list_received(user.user_id, page.page(), page.limit())
        .await?;

    Ok(Json(trades))
}

/// PUT /api/trades/:id/status - The single status transition entry point
pub async fn update_trade_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade = state
        .trade_service
        .update_status(id, user.user_id, req.status)
        .await?;

    Ok(Json(trade))
}

/// POST /api/trades/:id/deposit - Pay the caller's escrow deposit
pub async fn pay_trade_deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade = state.trade_service.pay_deposit(id, user.user_id).await?;
    Ok(Json(trade))
}

/// POST /api/trades/:id/ship - Record the caller's shipment
pub async fn ship_trade_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ShipRequest>,
) -> Result<Json<TradeResponse>, ApiError> {
    req.validate()?;

    let trade = state
        .trade_service
        .ship_item(id, user.user_id, &req.tracking_no)
        .await?;

    Ok(Json(trade))
}

/// Query parameters for the deposit quote
#[derive(Debug, Deserialize)]
pub struct DepositQuoteQuery {
    pub estimated_value: Decimal,
}

/// GET /api/trades/deposit-quote - What a deposit would cost the caller now
pub async fn deposit_quote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<DepositQuoteQuery>,
) -> Result<Json<DepositQuote>, ApiError> {
    let quote = state
        .trade_service
        .calculate_deposit(user.user_id, query.estimated_value)
        .await?;

    Ok(Json(quote))
}
