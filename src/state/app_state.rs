//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::credit::CreditService;
use crate::item::ItemService;
use crate::notification::NotificationService;
use crate::trade::TradeService;
use crate::wallet::WalletService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub trade_service: Arc<TradeService>,
    pub item_service: Arc<ItemService>,
    pub wallet_service: Arc<WalletService>,
    pub credit_service: Arc<CreditService>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(db_pool: PgPool) -> Self {
        let item_service = ItemService::new(db_pool.clone());

        Self {
            trade_service: Arc::new(TradeService::new(db_pool.clone(), item_service.clone())),
            item_service: Arc::new(item_service),
            wallet_service: Arc::new(WalletService::new(db_pool.clone())),
            credit_service: Arc::new(CreditService::new(db_pool.clone())),
            notification_service: Arc::new(NotificationService::new(db_pool.clone())),
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<TradeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.trade_service.clone()
    }
}

impl FromRef<AppState> for Arc<ItemService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.item_service.clone()
    }
}

impl FromRef<AppState> for Arc<WalletService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.wallet_service.clone()
    }
}

impl FromRef<AppState> for Arc<CreditService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.credit_service.clone()
    }
}

impl FromRef<AppState> for Arc<NotificationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notification_service.clone()
    }
}
