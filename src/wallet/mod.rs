//! Ledger (wallet) store - points/cash balances, escrow freezes, audit trail

pub mod model;
pub mod service;

pub use model::{
    RechargeRequest, Wallet, WalletSummary, WalletTransaction, WalletTxType,
    POINTS_PER_CURRENCY_UNIT,
};
pub use service::WalletService;
