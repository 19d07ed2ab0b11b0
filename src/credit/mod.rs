//! Credit score engine - reputation and trading privileges

pub mod model;
pub mod service;

pub use model::{CreditChangeType, CreditRecord, CreditSummary, CreditTier};
pub use service::CreditService;
