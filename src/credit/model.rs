//! Credit scoring models for BarterHub
//!
//! A user's running score translates into a discrete trust tier which gates
//! remote trading and sizes escrow deposits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Score every user starts with
pub const INITIAL_SCORE: i32 = 100;

/// Minimum score for the NORMAL tier
pub const TIER_NORMAL_MIN: i32 = 60;

/// Minimum score for the GOOD tier
pub const TIER_GOOD_MIN: i32 = 151;

/// Minimum score for the EXCELLENT tier
pub const TIER_EXCELLENT_MIN: i32 = 301;

/// Append-only record of a single credit score change
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CreditRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub change_type: CreditChangeType,
    pub score_change: i32,
    pub score_after: i32,
    pub description: String,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Why a credit score changed
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "credit_change_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditChangeType {
    Initial,
    TradeComplete,
    GoodReview,
    OnTimeShip,
    TradeCancel,
    LateShip,
    BadReview,
    ReportConfirmed,
    DepositDefault,
}

/// Trust tier derived from the running score
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTier {
    /// [0, 60) - barred from remote trade
    Newbie,
    /// [60, 151)
    Normal,
    /// [151, 301)
    Good,
    /// [301, inf)
    Excellent,
}

impl CreditTier {
    pub fn from_score(score: i32) -> Self {
        if score >= TIER_EXCELLENT_MIN {
            CreditTier::Excellent
        } else if score >= TIER_GOOD_MIN {
            CreditTier::Good
        } else if score >= TIER_NORMAL_MIN {
            CreditTier::Normal
        } else {
            CreditTier::Newbie
        }
    }

    /// Fraction of the estimated value a party of this tier must escrow.
    /// Newbies carry the full ratio on paper but are barred from remote
    /// trade outright.
    pub fn deposit_ratio(&self) -> Decimal {
        match self {
            CreditTier::Excellent => Decimal::ZERO,
            CreditTier::Good => Decimal::new(5, 1),
            CreditTier::Normal => Decimal::ONE,
            CreditTier::Newbie => Decimal::ONE,
        }
    }

    /// Remote trade is open to everyone above the entry tier
    pub fn can_remote_trade(&self) -> bool {
        *self != CreditTier::Newbie
    }

    /// Score needed to reach the next tier, if any
    pub fn next_tier_score(&self) -> Option<i32> {
        match self {
            CreditTier::Newbie => Some(TIER_NORMAL_MIN),
            CreditTier::Normal => Some(TIER_GOOD_MIN),
            CreditTier::Good => Some(TIER_EXCELLENT_MIN),
            CreditTier::Excellent => None,
        }
    }
}

/// Credit standing projection returned by the API
#[derive(Debug, Serialize, Clone)]
pub struct CreditSummary {
    pub credit_score: i32,
    pub tier: CreditTier,
    pub deposit_ratio: Decimal,
    pub can_remote_trade: bool,
    pub next_tier_score: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_score_boundaries() {
        assert_eq!(CreditTier::from_score(0), CreditTier::Newbie);
        assert_eq!(CreditTier::from_score(59), CreditTier::Newbie);
        assert_eq!(CreditTier::from_score(60), CreditTier::Normal);
        assert_eq!(CreditTier::from_score(150), CreditTier::Normal);
        assert_eq!(CreditTier::from_score(151), CreditTier::Good);
        assert_eq!(CreditTier::from_score(300), CreditTier::Good);
        assert_eq!(CreditTier::from_score(301), CreditTier::Excellent);
        assert_eq!(CreditTier::from_score(10_000), CreditTier::Excellent);
    }

    #[test]
    fn test_deposit_ratio_by_tier() {
        assert_eq!(CreditTier::Excellent.deposit_ratio(), Decimal::ZERO);
        assert_eq!(CreditTier::Good.deposit_ratio(), Decimal::new(5, 1));
        assert_eq!(CreditTier::Normal.deposit_ratio(), Decimal::ONE);
        assert_eq!(CreditTier::Newbie.deposit_ratio(), Decimal::ONE);
    }

    #[test]
    fn test_remote_trade_gate() {
        assert!(!CreditTier::Newbie.can_remote_trade());
        assert!(CreditTier::Normal.can_remote_trade());
        assert!(CreditTier::Good.can_remote_trade());
        assert!(CreditTier::Excellent.can_remote_trade());
    }

    #[test]
    fn test_next_tier_score() {
        assert_eq!(CreditTier::Newbie.next_tier_score(), Some(TIER_NORMAL_MIN));
        assert_eq!(CreditTier::Normal.next_tier_score(), Some(TIER_GOOD_MIN));
        assert_eq!(CreditTier::Good.next_tier_score(), Some(TIER_EXCELLENT_MIN));
        assert_eq!(CreditTier::Excellent.next_tier_score(), None);
    }
}
