//! Route definitions for the BarterHub API

mod item;
mod notification;
mod trade;
mod wallet;

pub use item::item_routes;
pub use notification::notification_routes;
pub use trade::trade_routes;
pub use wallet::wallet_routes;
