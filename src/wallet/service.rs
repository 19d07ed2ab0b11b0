//! Wallet service layer - the only writer of ledger balances
//!
//! Every mutation is an atomic read-modify-write against a row locked
//! `FOR UPDATE`, paired with an immutable `wallet_transactions` entry. The
//! connection-level operations (freeze / unfreeze / forfeit) compose into the
//! trade state machine's transaction so escrow accounting commits or rolls
//! back together with the trade transition that caused it.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::wallet::model::{
    advance_streak, Wallet, WalletSummary, WalletTransaction, WalletTxType,
};

/// Points granted for a confirmed referral
pub const INVITE_REWARD_POINTS: i32 = 50;

#[derive(Clone)]
pub struct WalletService {
    db_pool: PgPool,
}

impl WalletService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch the user's wallet with a row lock, creating it on first use.
    pub async fn get_or_create_for_update(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Wallet, ApiError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(wallet)
    }

    /// Freeze points and cash as an escrow deposit. Fails `InsufficientFunds`
    /// when either split exceeds the available (unfrozen) funds; the totals on
    /// the books are unchanged, only availability moves.
    pub async fn freeze(
        conn: &mut PgConnection,
        user_id: Uuid,
        points: i32,
        cash: Decimal,
        related_id: Uuid,
    ) -> Result<(), ApiError> {
        let wallet = Self::get_or_create_for_update(&mut *conn, user_id).await?;

        if points > wallet.available_points() {
            return Err(ApiError::InsufficientFunds(
                "Not enough available points".to_string(),
            ));
        }
        if cash > wallet.available_balance() {
            return Err(ApiError::InsufficientFunds(
                "Not enough available cash".to_string(),
            ));
        }

        let frozen_points = wallet.frozen_points + points;
        let frozen_balance = wallet.frozen_balance + cash;

        Self::store_balances(&mut *conn, wallet.id, wallet.points, wallet.balance, frozen_points, frozen_balance)
            .await?;

        Self::record_transaction(
            &mut *conn,
            user_id,
            WalletTxType::DepositFreeze,
            -points,
            -cash,
            wallet.points - frozen_points,
            wallet.balance - frozen_balance,
            "Escrow deposit frozen",
            Some(related_id),
        )
        .await?;

        Ok(())
    }

    /// Release a previously frozen deposit. Totals are unaffected; only
    /// availability changes. Floored at zero so a double release cannot drive
    /// the frozen fields negative.
    pub async fn unfreeze(
        conn: &mut PgConnection,
        user_id: Uuid,
        points: i32,
        cash: Decimal,
        related_id: Uuid,
    ) -> Result<(), ApiError> {
        let wallet = Self::get_or_create_for_update(&mut *conn, user_id).await?;

        let frozen_points = (wallet.frozen_points - points).max(0);
        let frozen_balance = (wallet.frozen_balance - cash).max(Decimal::ZERO);

        Self::store_balances(&mut *conn, wallet.id, wallet.points, wallet.balance, frozen_points, frozen_balance)
            .await?;

        Self::record_transaction(
            &mut *conn,
            user_id,
            WalletTxType::DepositUnfreeze,
            points,
            cash,
            wallet.points - frozen_points,
            wallet.balance - frozen_balance,
            "Escrow deposit refunded",
            Some(related_id),
        )
        .await?;

        Ok(())
    }

    /// Transfer a frozen deposit from the defaulting party to the
    /// counterparty. Both wallets are locked in ascending user-id order and
    /// mutated in the caller's transaction, so the debit and credit commit as
    /// one unit.
    pub async fn forfeit(
        conn: &mut PgConnection,
        violator_id: Uuid,
        receiver_id: Uuid,
        points: i32,
        cash: Decimal,
        related_id: Uuid,
    ) -> Result<(), ApiError> {
        // Lock order is by user id so two concurrent forfeits cannot deadlock
        let (violator, receiver) = if violator_id < receiver_id {
            let v = Self::get_or_create_for_update(&mut *conn, violator_id).await?;
            let r = Self::get_or_create_for_update(&mut *conn, receiver_id).await?;
            (v, r)
        } else {
            let r = Self::get_or_create_for_update(&mut *conn, receiver_id).await?;
            let v = Self::get_or_create_for_update(&mut *conn, violator_id).await?;
            (v, r)
        };

        let violator_points = (violator.points - points).max(0);
        let violator_frozen_points = (violator.frozen_points - points).max(0);
        let violator_balance = (violator.balance - cash).max(Decimal::ZERO);
        let violator_frozen_balance = (violator.frozen_balance - cash).max(Decimal::ZERO);

        Self::store_balances(
            &mut *conn,
            violator.id,
            violator_points,
            violator_balance,
            violator_frozen_points,
            violator_frozen_balance,
        )
        .await?;

        let receiver_points = receiver.points + points;
        let receiver_balance = receiver.balance + cash;

        Self::store_balances(
            &mut *conn,
            receiver.id,
            receiver_points,
            receiver_balance,
            receiver.frozen_points,
            receiver.frozen_balance,
        )
        .await?;

        Self::record_transaction(
            &mut *conn,
            violator_id,
            WalletTxType::DepositForfeit,
            -points,
            -cash,
            violator_points - violator_frozen_points,
            violator_balance - violator_frozen_balance,
            "Escrow deposit forfeited for default",
            Some(related_id),
        )
        .await?;

        Self::record_transaction(
            &mut *conn,
            receiver_id,
            WalletTxType::DepositReceive,
            points,
            cash,
            receiver_points,
            receiver_balance,
            "Received forfeited counterparty deposit",
            Some(related_id),
        )
        .await?;

        tracing::warn!(
            violator = %violator_id,
            receiver = %receiver_id,
            points,
            %cash,
            "Escrow deposit forfeited"
        );

        Ok(())
    }

    /// Daily sign-in. The reward equals the day-over-day streak length in
    /// points, uncapped; a gap resets the streak to 1 and a second attempt on
    /// the same calendar day fails `AlreadySignedIn`.
    pub async fn sign_in(&self, user_id: Uuid) -> Result<WalletTransaction, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let wallet = Self::get_or_create_for_update(&mut tx, user_id).await?;
        let today = Utc::now().date_naive();

        let streak = advance_streak(wallet.last_sign_in_on, wallet.sign_in_streak, today)
            .ok_or(ApiError::AlreadySignedIn)?;
        let reward = streak;

        let new_points = wallet.points + reward;
        sqlx::query(
            r#"
            UPDATE wallets
            SET points = $1, last_sign_in_on = $2, sign_in_streak = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(new_points)
        .bind(today)
        .bind(streak)
        .bind(Utc::now())
        .bind(wallet.id)
        .execute(&mut *tx)
        .await?;

        let transaction = Self::record_transaction(
            &mut tx,
            user_id,
            WalletTxType::SignIn,
            reward,
            Decimal::ZERO,
            new_points,
            wallet.balance,
            &format!("Daily sign-in reward (day {} of streak)", streak),
            None,
        )
        .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Recharge stub. Credits the balance directly; a real payment gateway is
    /// an external collaborator.
    pub async fn recharge(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<WalletTransaction, ApiError> {
        if amount <= Decimal::ZERO {
            return Err(ApiError::InvalidOperation(
                "Recharge amount must be positive".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await?;

        let wallet = Self::get_or_create_for_update(&mut tx, user_id).await?;
        let new_balance = wallet.balance + amount;

        Self::store_balances(
            &mut tx,
            wallet.id,
            wallet.points,
            new_balance,
            wallet.frozen_points,
            wallet.frozen_balance,
        )
        .await?;

        let transaction = Self::record_transaction(
            &mut tx,
            user_id,
            WalletTxType::Recharge,
            0,
            amount,
            wallet.points,
            new_balance,
            &format!("Recharged {}", amount),
            None,
        )
        .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Grant the fixed referral reward to a user who brought in a new member.
    pub async fn referral_reward(
        &self,
        user_id: Uuid,
        invited_user_id: Uuid,
    ) -> Result<WalletTransaction, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let wallet = Self::get_or_create_for_update(&mut tx, user_id).await?;
        let new_points = wallet.points + INVITE_REWARD_POINTS;

        Self::store_balances(
            &mut tx,
            wallet.id,
            new_points,
            wallet.balance,
            wallet.frozen_points,
            wallet.frozen_balance,
        )
        .await?;

        let transaction = Self::record_transaction(
            &mut tx,
            user_id,
            WalletTxType::InviteReward,
            INVITE_REWARD_POINTS,
            Decimal::ZERO,
            new_points,
            wallet.balance,
            "Referral reward",
            Some(invited_user_id),
        )
        .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Wallet projection for the API
    pub async fn wallet_summary(&self, user_id: Uuid) -> Result<WalletSummary, ApiError> {
        let mut tx = self.db_pool.begin().await?;
        let wallet = Self::get_or_create_for_update(&mut tx, user_id).await?;
        tx.commit().await?;

        let today = Utc::now().date_naive();
        let next = advance_streak(wallet.last_sign_in_on, wallet.sign_in_streak, today);

        Ok(WalletSummary {
            points: wallet.points,
            balance: wallet.balance,
            frozen_points: wallet.frozen_points,
            frozen_balance: wallet.frozen_balance,
            available_points: wallet.available_points(),
            available_balance: wallet.available_balance(),
            signed_in_today: next.is_none(),
            sign_in_streak: wallet.sign_in_streak,
            next_sign_in_points: next.unwrap_or(wallet.sign_in_streak + 1),
        })
    }

    /// Paginated transaction history, newest first
    pub async fn transactions(
        &self,
        user_id: Uuid,
        page: i32,
        limit: i32,
    ) -> Result<Vec<WalletTransaction>, ApiError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let transactions = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT * FROM wallet_transactions
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

        Ok(transactions)
    }

    // ===== Private Helper Methods =====

    async fn store_balances(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        points: i32,
        balance: Decimal,
        frozen_points: i32,
        frozen_balance: Decimal,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE wallets
            SET points = $1, balance = $2, frozen_points = $3, frozen_balance = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(points)
        .bind(balance)
        .bind(frozen_points)
        .bind(frozen_balance)
        .bind(Utc::now())
        .bind(wallet_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_transaction(
        conn: &mut PgConnection,
        user_id: Uuid,
        tx_type: WalletTxType,
        points_change: i32,
        balance_change: Decimal,
        points_after: i32,
        balance_after: Decimal,
        description: &str,
        related_id: Option<Uuid>,
    ) -> Result<WalletTransaction, ApiError> {
        let transaction = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions (id, user_id, tx_type, points_change, balance_change,
                                             points_after, balance_after, description, related_id,
                                             created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tx_type)
        .bind(points_change)
        .bind(balance_change)
        .bind(points_after)
        .bind(balance_after)
        .bind(description)
        .bind(related_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(transaction)
    }
}
