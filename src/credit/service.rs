//! Credit service layer - reputation changes and trading privileges
//!
//! The score itself is the denormalized current value on the user row; the
//! full history lives in the append-only `credit_records` table. A change is
//! floored at zero and has no upper bound.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::credit::model::{CreditChangeType, CreditRecord, CreditSummary, CreditTier};
use crate::error::ApiError;
use crate::user;

// Fixed score deltas per change type

pub const TRADE_COMPLETE: i32 = 5;
pub const GOOD_REVIEW: i32 = 3;
pub const ON_TIME_SHIP: i32 = 1;
pub const TRADE_CANCEL: i32 = -10;
pub const LATE_SHIP: i32 = -25;
pub const BAD_REVIEW: i32 = -8;
pub const REPORT_CONFIRMED: i32 = -40;
pub const DEPOSIT_DEFAULT: i32 = -50;

#[derive(Clone)]
pub struct CreditService {
    db_pool: PgPool,
}

impl CreditService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Apply a score change inside the caller's transaction and append the
    /// history record carrying the post-change score.
    pub async fn add_credit(
        conn: &mut PgConnection,
        user_id: Uuid,
        change_type: CreditChangeType,
        delta: i32,
        description: &str,
        related_id: Option<Uuid>,
    ) -> Result<i32, ApiError> {
        let user = user::get_user_for_update(&mut *conn, user_id).await?;
        let new_score = (user.credit_score + delta).max(0);

        sqlx::query("UPDATE users SET credit_score = $1 WHERE id = $2")
            .bind(new_score)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO credit_records (id, user_id, change_type, score_change, score_after,
                                        description, related_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(change_type)
        .bind(delta)
        .bind(new_score)
        .bind(description)
        .bind(related_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        tracing::info!(
            user_id = %user_id,
            change_type = ?change_type,
            delta,
            score_after = new_score,
            "Credit score updated"
        );

        Ok(new_score)
    }

    pub async fn on_trade_complete(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::TradeComplete,
            TRADE_COMPLETE,
            "Trade completed",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    pub async fn on_time_ship(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::OnTimeShip,
            ON_TIME_SHIP,
            "Shipped on time",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    pub async fn on_trade_cancel(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::TradeCancel,
            TRADE_CANCEL,
            "Trade cancelled",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    pub async fn on_good_review(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::GoodReview,
            GOOD_REVIEW,
            "Received a positive review",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    pub async fn on_bad_review(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::BadReview,
            BAD_REVIEW,
            "Received a negative review",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    pub async fn on_late_ship(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::LateShip,
            LATE_SHIP,
            "Failed to ship on time",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    pub async fn on_report_confirmed(
        conn: &mut PgConnection,
        user_id: Uuid,
        related_id: Option<Uuid>,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::ReportConfirmed,
            REPORT_CONFIRMED,
            "Report against user confirmed",
            related_id,
        )
        .await?;
        Ok(())
    }

    pub async fn on_deposit_default(
        conn: &mut PgConnection,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::add_credit(
            conn,
            user_id,
            CreditChangeType::DepositDefault,
            DEPOSIT_DEFAULT,
            "Defaulted on an escrow deposit",
            Some(trade_id),
        )
        .await?;
        Ok(())
    }

    /// Credit standing projection for the API
    pub async fn credit_summary(&self, user_id: Uuid) -> Result<CreditSummary, ApiError> {
        let user = user::fetch_user(&self.db_pool, user_id).await?;
        let tier = CreditTier::from_score(user.credit_score);

        Ok(CreditSummary {
            credit_score: user.credit_score,
            tier,
            deposit_ratio: tier.deposit_ratio(),
            can_remote_trade: tier.can_remote_trade(),
            next_tier_score: tier.next_tier_score(),
        })
    }

    /// Paginated credit history, newest first
    pub async fn credit_records(
        &self,
        user_id: Uuid,
        page: i32,
        limit: i32,
    ) -> Result<Vec<CreditRecord>, ApiError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let records = sqlx::query_as::<_, CreditRecord>(
            r#"
            SELECT * FROM credit_records
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(records)
    }
}
