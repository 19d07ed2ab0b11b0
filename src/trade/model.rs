//! Trade models and the pure pieces of the lifecycle state machine
//!
//! The transition table, the two-phase confirmation sub-state and the
//! deposit point/cash split are plain functions here so the service layer
//! stays a thin orchestration over them.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::item::ItemSummary;
use crate::user::UserBrief;
use crate::wallet::POINTS_PER_CURRENCY_UNIT;

/// Trade request aggregate - mutated exclusively through the state machine
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct TradeRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    /// Owner of the target item at creation time. Captured on the row so
    /// party resolution stays stable after the completion ownership swap.
    pub target_owner_id: Uuid,
    pub target_item_id: Uuid,
    pub offered_item_id: Uuid,
    pub message: Option<String>,
    pub status: TradeStatus,
    pub trade_mode: TradeMode,
    pub estimated_value: Option<Decimal>,
    pub requester_confirmed: bool,
    pub target_confirmed: bool,
    pub requester_deposit_paid: bool,
    pub target_deposit_paid: bool,
    pub requester_tracking_no: Option<String>,
    pub target_tracking_no: Option<String>,
    pub requester_shipped_at: Option<DateTime<Utc>>,
    pub target_shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a trade request
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "trade_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Awaiting the target owner's decision
    Pending,
    /// Accepted; in-person trades confirm from here, remote trades fund deposits
    Accepted,
    /// Both remote deposits frozen, awaiting shipment
    DepositPaid,
    /// One party has shipped
    Shipping,
    /// Both parties have shipped, awaiting receipt confirmations
    Delivered,
    Completed,
    Rejected,
    Cancelled,
}

impl TradeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TradeStatus::Completed | TradeStatus::Rejected | TradeStatus::Cancelled
        )
    }

    /// States a party may cancel from
    pub fn cancellable(self) -> bool {
        matches!(
            self,
            TradeStatus::Pending | TradeStatus::Accepted | TradeStatus::DepositPaid
        )
    }
}

/// How the two items change hands
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "trade_mode", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeMode {
    InPerson,
    Remote,
}

/// The two parties to a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Requester,
    TargetOwner,
}

impl Party {
    pub fn other(self) -> Party {
        match self {
            Party::Requester => Party::TargetOwner,
            Party::TargetOwner => Party::Requester,
        }
    }
}

/// Two-phase completion sub-state, made explicit so the boolean pair cannot
/// drift into impossible combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    NoneConfirmed,
    OneConfirmed(Party),
    BothConfirmed,
}

impl ConfirmationState {
    pub fn from_flags(requester_confirmed: bool, target_confirmed: bool) -> Self {
        match (requester_confirmed, target_confirmed) {
            (false, false) => ConfirmationState::NoneConfirmed,
            (true, false) => ConfirmationState::OneConfirmed(Party::Requester),
            (false, true) => ConfirmationState::OneConfirmed(Party::TargetOwner),
            (true, true) => ConfirmationState::BothConfirmed,
        }
    }

    /// Apply one party's confirmation. Returns `None` when that party has
    /// already confirmed (or the trade is already fully confirmed).
    pub fn confirm(self, party: Party) -> Option<ConfirmationState> {
        match self {
            ConfirmationState::NoneConfirmed => Some(ConfirmationState::OneConfirmed(party)),
            ConfirmationState::OneConfirmed(p) if p == party => None,
            ConfirmationState::OneConfirmed(_) => Some(ConfirmationState::BothConfirmed),
            ConfirmationState::BothConfirmed => None,
        }
    }
}

impl TradeRequest {
    /// Which party the given user is, if any
    pub fn party_of(&self, user_id: Uuid) -> Option<Party> {
        if user_id == self.requester_id {
            Some(Party::Requester)
        } else if user_id == self.target_owner_id {
            Some(Party::TargetOwner)
        } else {
            None
        }
    }

    pub fn party_user_id(&self, party: Party) -> Uuid {
        match party {
            Party::Requester => self.requester_id,
            Party::TargetOwner => self.target_owner_id,
        }
    }

    pub fn confirmation(&self) -> ConfirmationState {
        ConfirmationState::from_flags(self.requester_confirmed, self.target_confirmed)
    }

    pub fn deposit_paid_by(&self, party: Party) -> bool {
        match party {
            Party::Requester => self.requester_deposit_paid,
            Party::TargetOwner => self.target_deposit_paid,
        }
    }

    pub fn tracking_no_of(&self, party: Party) -> Option<&str> {
        match party {
            Party::Requester => self.requester_tracking_no.as_deref(),
            Party::TargetOwner => self.target_tracking_no.as_deref(),
        }
    }
}

/// The requestable transitions of the lifecycle table. Everything else is an
/// `InvalidStateTransition`, checked before any actor or idempotency rule.
pub fn transition_allowed(from: TradeStatus, to: TradeStatus, mode: TradeMode) -> bool {
    use TradeStatus::*;

    match (from, to) {
        (Pending, Accepted) | (Pending, Rejected) => true,
        (Accepted, Completed) => mode == TradeMode::InPerson,
        (Delivered, Completed) => mode == TradeMode::Remote,
        (source, Cancelled) => source.cancellable(),
        _ => false,
    }
}

/// Split a deposit between points and cash: points cover as much of the
/// amount as are available (at 100 points per currency unit), the remainder
/// is cash. A payer with zero available points pays entirely in cash.
pub fn split_deposit(total: Decimal, available_points: i32) -> (i32, Decimal) {
    let points_needed = (total * Decimal::from(POINTS_PER_CURRENCY_UNIT))
        .trunc()
        .to_i32()
        .unwrap_or(i32::MAX)
        .max(0);

    let points = available_points.clamp(0, points_needed);
    let cash = total - Decimal::from(points) / Decimal::from(POINTS_PER_CURRENCY_UNIT);

    (points, cash)
}

/// Escrow deposit row - one per (trade, user) pair on remote trades
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct TradeDeposit {
    pub id: Uuid,
    pub trade_request_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub points_amount: i32,
    pub cash_amount: Decimal,
    pub status: DepositStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Deposit lifecycle; REFUNDED and FORFEITED are terminal
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "deposit_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Pending,
    Frozen,
    Refunded,
    Forfeited,
}

/// Request DTO for creating a trade request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTradeRequest {
    pub target_item_id: Uuid,
    pub offered_item_id: Uuid,
    pub trade_mode: Option<TradeMode>,
    pub estimated_value: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

/// Request DTO for the single status transition entry point
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TradeStatus,
}

/// Request DTO for recording a shipment
#[derive(Debug, Deserialize, Validate)]
pub struct ShipRequest {
    #[validate(length(min = 1, max = 64))]
    pub tracking_no: String,
}

/// Read-only deposit quote for the current user
#[derive(Debug, Serialize)]
pub struct DepositQuote {
    pub total_amount: Decimal,
    pub ratio: Decimal,
    pub points_needed: i32,
    pub cash_needed: Decimal,
    pub can_afford: bool,
}

/// Serializable trade projection returned to the transport layer
#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub id: Uuid,
    pub target_item: ItemSummary,
    pub offered_item: ItemSummary,
    pub requester: UserBrief,
    pub message: Option<String>,
    pub status: TradeStatus,
    pub trade_mode: TradeMode,
    pub estimated_value: Option<Decimal>,
    pub requester_confirmed: bool,
    pub target_confirmed: bool,
    pub requester_deposit_paid: bool,
    pub target_deposit_paid: bool,
    pub requester_tracking_no: Option<String>,
    pub target_tracking_no: Option<String>,
    pub requester_shipped_at: Option<DateTime<Utc>>,
    pub target_shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ALL_STATUSES: [TradeStatus; 8] = [
        TradeStatus::Pending,
        TradeStatus::Accepted,
        TradeStatus::DepositPaid,
        TradeStatus::Shipping,
        TradeStatus::Delivered,
        TradeStatus::Completed,
        TradeStatus::Rejected,
        TradeStatus::Cancelled,
    ];

    #[test]
    fn test_transition_table_in_person() {
        use TradeStatus::*;

        let allowed = [
            (Pending, Accepted),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Accepted, Completed),
            (Accepted, Cancelled),
            (DepositPaid, Cancelled),
        ];

        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    transition_allowed(from, to, TradeMode::InPerson),
                    expected,
                    "in-person {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_transition_table_remote() {
        use TradeStatus::*;

        let allowed = [
            (Pending, Accepted),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Accepted, Cancelled),
            (DepositPaid, Cancelled),
            (Delivered, Completed),
        ];

        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    transition_allowed(from, to, TradeMode::Remote),
                    expected,
                    "remote {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TradeStatus::Completed.is_terminal());
        assert!(TradeStatus::Rejected.is_terminal());
        assert!(TradeStatus::Cancelled.is_terminal());
        assert!(!TradeStatus::Pending.is_terminal());
        assert!(!TradeStatus::Shipping.is_terminal());
    }

    #[test]
    fn test_confirmation_sub_state() {
        let start = ConfirmationState::NoneConfirmed;

        let one = start.confirm(Party::Requester).unwrap();
        assert_eq!(one, ConfirmationState::OneConfirmed(Party::Requester));

        // Same party confirming twice is rejected
        assert_eq!(one.confirm(Party::Requester), None);

        let both = one.confirm(Party::TargetOwner).unwrap();
        assert_eq!(both, ConfirmationState::BothConfirmed);

        // Fully confirmed accepts no further confirmations
        assert_eq!(both.confirm(Party::Requester), None);
        assert_eq!(both.confirm(Party::TargetOwner), None);
    }

    #[test]
    fn test_confirmation_from_flags() {
        assert_eq!(
            ConfirmationState::from_flags(false, false),
            ConfirmationState::NoneConfirmed
        );
        assert_eq!(
            ConfirmationState::from_flags(false, true),
            ConfirmationState::OneConfirmed(Party::TargetOwner)
        );
        assert_eq!(
            ConfirmationState::from_flags(true, true),
            ConfirmationState::BothConfirmed
        );
    }

    #[test]
    fn test_split_deposit_points_first() {
        // 100.00 deposit, 5 000 points available: points cover 50.00
        let (points, cash) = split_deposit(dec!(100.00), 5_000);
        assert_eq!(points, 5_000);
        assert_eq!(cash, dec!(50.00));
    }

    #[test]
    fn test_split_deposit_points_capped_at_need() {
        // 10.00 deposit needs 1 000 points; the surplus stays in the wallet
        let (points, cash) = split_deposit(dec!(10.00), 999_999);
        assert_eq!(points, 1_000);
        assert_eq!(cash, dec!(0.00));
    }

    #[test]
    fn test_split_deposit_zero_points_all_cash() {
        // A payer with no points pays the whole deposit in cash
        let (points, cash) = split_deposit(dec!(100.00), 0);
        assert_eq!(points, 0);
        assert_eq!(cash, dec!(100.00));
    }

    #[test]
    fn test_split_deposit_zero_total() {
        let (points, cash) = split_deposit(Decimal::ZERO, 800);
        assert_eq!(points, 0);
        assert_eq!(cash, Decimal::ZERO);
    }

    #[test]
    fn test_split_deposit_negative_available_floored() {
        let (points, cash) = split_deposit(dec!(25.00), -10);
        assert_eq!(points, 0);
        assert_eq!(cash, dec!(25.00));
    }
}
