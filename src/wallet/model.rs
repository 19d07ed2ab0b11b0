//! Wallet models and data structures for the BarterHub ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversion rate between points and cash: 100 points = 1 currency unit
pub const POINTS_PER_CURRENCY_UNIT: i32 = 100;

/// Wallet model - one per user
///
/// `points`/`balance` are the totals on the books; the frozen fields carry
/// the portion committed to open escrow deposits. Available funds are always
/// total minus frozen and never go negative.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i32,
    pub balance: Decimal,
    pub frozen_points: i32,
    pub frozen_balance: Decimal,
    pub last_sign_in_on: Option<NaiveDate>,
    pub sign_in_streak: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn available_points(&self) -> i32 {
        self.points - self.frozen_points
    }

    pub fn available_balance(&self) -> Decimal {
        self.balance - self.frozen_balance
    }
}

/// Append-only ledger entry, one per mutating wallet operation
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_type: WalletTxType,
    pub points_change: i32,
    pub balance_change: Decimal,
    pub points_after: i32,
    pub balance_after: Decimal,
    pub description: String,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Kind of wallet mutation
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "wallet_tx_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletTxType {
    Recharge,
    SignIn,
    DepositFreeze,
    DepositUnfreeze,
    DepositForfeit,
    DepositReceive,
    InviteReward,
}

/// Wallet projection returned by the API
#[derive(Debug, Serialize, Clone)]
pub struct WalletSummary {
    pub points: i32,
    pub balance: Decimal,
    pub frozen_points: i32,
    pub frozen_balance: Decimal,
    pub available_points: i32,
    pub available_balance: Decimal,
    pub signed_in_today: bool,
    pub sign_in_streak: i32,
    pub next_sign_in_points: i32,
}

/// Request DTO for the recharge stub
#[derive(Debug, Deserialize)]
pub struct RechargeRequest {
    pub amount: Decimal,
}

/// Compute the streak a sign-in today would extend to, or `None` when the
/// user has already signed in today. A gap of more than one day resets the
/// streak to 1.
pub fn advance_streak(
    last_sign_in_on: Option<NaiveDate>,
    current_streak: i32,
    today: NaiveDate,
) -> Option<i32> {
    match last_sign_in_on {
        Some(last) if last == today => None,
        Some(last) if last.succ_opt() == Some(today) => Some(current_streak.max(0) + 1),
        _ => Some(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_sign_in_starts_streak() {
        assert_eq!(advance_streak(None, 0, day(2025, 6, 1)), Some(1));
    }

    #[test]
    fn test_same_day_sign_in_rejected() {
        assert_eq!(advance_streak(Some(day(2025, 6, 1)), 3, day(2025, 6, 1)), None);
    }

    #[test]
    fn test_consecutive_day_extends_streak() {
        assert_eq!(
            advance_streak(Some(day(2025, 6, 1)), 3, day(2025, 6, 2)),
            Some(4)
        );
    }

    #[test]
    fn test_gap_resets_streak() {
        assert_eq!(
            advance_streak(Some(day(2025, 6, 1)), 9, day(2025, 6, 3)),
            Some(1)
        );
    }

    #[test]
    fn test_streak_crosses_month_boundary() {
        assert_eq!(
            advance_streak(Some(day(2025, 5, 31)), 2, day(2025, 6, 1)),
            Some(3)
        );
    }

    #[test]
    fn test_available_funds() {
        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            points: 500,
            balance: Decimal::new(10_000, 2),
            frozen_points: 120,
            frozen_balance: Decimal::new(2_550, 2),
            last_sign_in_on: None,
            sign_in_streak: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(wallet.available_points(), 380);
        assert_eq!(wallet.available_balance(), Decimal::new(7_450, 2));
    }
}
