//! Trade request state machine and escrow deposits

pub mod model;
pub mod service;

pub use model::{
    split_deposit, transition_allowed, ConfirmationState, CreateTradeRequest, DepositQuote,
    DepositStatus, Party, ShipRequest, TradeDeposit, TradeMode, TradeRequest, TradeResponse,
    TradeStatus, UpdateStatusRequest,
};
pub use service::TradeService;
