//! Trade service layer - the single mutation entry point of the lifecycle
//!
//! Every operation opens one transaction, locks the trade row `FOR UPDATE`,
//! validates against the transition table before touching anything, and then
//! applies the transition together with its item / wallet / credit side
//! effects. A rejected operation never leaves partial state behind.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::credit::{CreditService, CreditTier};
use crate::error::ApiError;
use crate::item::{ItemService, ItemStatus};
use crate::notification::NotificationService;
use crate::trade::model::{
    split_deposit, transition_allowed, ConfirmationState, CreateTradeRequest, DepositQuote,
    DepositStatus, Party, TradeDeposit, TradeMode, TradeRequest, TradeResponse, TradeStatus,
};
use crate::user;
use crate::wallet::WalletService;

#[derive(Clone)]
pub struct TradeService {
    db_pool: PgPool,
    item_service: ItemService,
}

impl TradeService {
    pub fn new(db_pool: PgPool, item_service: ItemService) -> Self {
        Self {
            db_pool,
            item_service,
        }
    }

    /// Create a trade request in PENDING. Items are validated but not held
    /// yet; the hold happens on acceptance.
    pub async fn create_trade_request(
        &self,
        requester_id: Uuid,
        request: CreateTradeRequest,
    ) -> Result<TradeResponse, ApiError> {
        request.validate()?;

        let trade_mode = request.trade_mode.unwrap_or(TradeMode::InPerson);

        let mut tx = self.db_pool.begin().await?;

        let target_item = ItemService::get_for_update(&mut tx, request.target_item_id).await?;
        let offered_item = ItemService::get_for_update(&mut tx, request.offered_item_id).await?;

        if target_item.owner_id == requester_id {
            return Err(ApiError::InvalidOperation(
                "Cannot trade for your own item".to_string(),
            ));
        }
        if offered_item.owner_id != requester_id {
            return Err(ApiError::InvalidOperation(
                "You can only offer an item you own".to_string(),
            ));
        }
        if target_item.status != ItemStatus::Available {
            return Err(ApiError::InvalidOperation(
                "Target item is not available for trade".to_string(),
            ));
        }
        if offered_item.status != ItemStatus::Available {
            return Err(ApiError::InvalidOperation(
                "Offered item is not available for trade".to_string(),
            ));
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM trade_requests
                WHERE requester_id = $1 AND target_item_id = $2 AND status IN ('pending', 'accepted')
            )
            "#,
        )
        .bind(requester_id)
        .bind(request.target_item_id)
        .fetch_one(&mut *tx)
        .await?;

        if duplicate {
            return Err(ApiError::InvalidOperation(
                "You already have an open request for this item".to_string(),
            ));
        }

        if trade_mode == TradeMode::Remote {
            let requester = user::get_user(&mut tx, requester_id).await?;
            if !CreditTier::from_score(requester.credit_score).can_remote_trade() {
                return Err(ApiError::PermissionDenied(
                    "Your credit tier does not allow remote trades".to_string(),
                ));
            }
            match request.estimated_value {
                Some(value) if value > Decimal::ZERO => {}
                _ => {
                    return Err(ApiError::InvalidOperation(
                        "Remote trades require a positive estimated value".to_string(),
                    ));
                }
            }
        }

        let trade = sqlx::query_as::<_, TradeRequest>(
            r#"
            INSERT INTO trade_requests (id, requester_id, target_owner_id, target_item_id,
                                        offered_item_id, message, status, trade_mode,
                                        estimated_value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(requester_id)
        .bind(target_item.owner_id)
        .bind(request.target_item_id)
        .bind(request.offered_item_id)
        .bind(&request.message)
        .bind(TradeStatus::Pending)
        .bind(trade_mode)
        .bind(request.estimated_value)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(trade_id = %trade.id, requester_id = %requester_id, ?trade_mode, "Trade request created");

        self.to_response(trade).await
    }

    /// The sole status mutation entry point. Validates the requested
    /// transition against the lifecycle table, then applies it with its side
    /// effects atomically.
    pub async fn update_status(
        &self,
        trade_id: Uuid,
        actor_id: Uuid,
        new_status: TradeStatus,
    ) -> Result<TradeResponse, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let mut trade = Self::fetch_for_update(&mut tx, trade_id).await?;
        let party = trade
            .party_of(actor_id)
            .ok_or_else(|| ApiError::PermissionDenied("Not a party to this trade".to_string()))?;

        if !transition_allowed(trade.status, new_status, trade.trade_mode) {
            return Err(ApiError::InvalidStateTransition(format!(
                "{:?} -> {:?} is not permitted",
                trade.status, new_status
            )));
        }

        let from = trade.status;

        match new_status {
            TradeStatus::Accepted => {
                Self::accept(&mut tx, &mut trade, party).await?;
            }
            TradeStatus::Rejected => {
                if party != Party::TargetOwner {
                    return Err(ApiError::PermissionDenied(
                        "Only the target owner can reject a request".to_string(),
                    ));
                }
                trade.status = TradeStatus::Rejected;
            }
            TradeStatus::Completed => {
                Self::confirm_completion(&mut tx, &mut trade, party).await?;
            }
            TradeStatus::Cancelled => {
                Self::cancel(&mut tx, &mut trade, party).await?;
            }
            other => {
                return Err(ApiError::InvalidStateTransition(format!(
                    "{:?} cannot be requested directly",
                    other
                )));
            }
        }

        trade.updated_at = Utc::now();
        Self::store(&mut tx, &trade).await?;
        tx.commit().await?;

        tracing::info!(
            trade_id = %trade.id,
            actor_id = %actor_id,
            from = ?from,
            to = ?trade.status,
            "Trade status updated"
        );

        self.to_response(trade).await
    }

    /// Pay the escrow deposit for a remote trade. Points cover as much of the
    /// amount as are available, the remainder is frozen from the cash balance.
    pub async fn pay_deposit(
        &self,
        trade_id: Uuid,
        actor_id: Uuid,
    ) -> Result<TradeResponse, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let mut trade = Self::fetch_for_update(&mut tx, trade_id).await?;

        if trade.trade_mode != TradeMode::Remote {
            return Err(ApiError::InvalidOperation(
                "In-person trades do not take deposits".to_string(),
            ));
        }
        if trade.status != TradeStatus::Accepted {
            return Err(ApiError::InvalidStateTransition(
                "Deposits can only be paid on an accepted trade".to_string(),
            ));
        }

        let party = trade
            .party_of(actor_id)
            .ok_or_else(|| ApiError::PermissionDenied("Not a party to this trade".to_string()))?;

        if trade.deposit_paid_by(party) {
            return Err(ApiError::InvalidOperation(
                "Deposit already paid".to_string(),
            ));
        }

        let estimated_value = trade.estimated_value.ok_or_else(|| {
            ApiError::Internal("Remote trade is missing its estimated value".to_string())
        })?;

        let payer = user::get_user(&mut tx, actor_id).await?;
        let ratio = CreditTier::from_score(payer.credit_score).deposit_ratio();
        let total = estimated_value * ratio;

        let wallet = WalletService::get_or_create_for_update(&mut tx, actor_id).await?;
        let (points, cash) = split_deposit(total, wallet.available_points());

        WalletService::freeze(&mut tx, actor_id, points, cash, trade.id).await?;

        sqlx::query(
            r#"
            INSERT INTO trade_deposits (id, trade_request_id, user_id, amount, points_amount,
                                        cash_amount, status, paid_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trade.id)
        .bind(actor_id)
        .bind(total)
        .bind(points)
        .bind(cash)
        .bind(DepositStatus::Frozen)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        match party {
            Party::Requester => trade.requester_deposit_paid = true,
            Party::TargetOwner => trade.target_deposit_paid = true,
        }

        if trade.requester_deposit_paid && trade.target_deposit_paid {
            trade.status = TradeStatus::DepositPaid;
            for recipient in [trade.requester_id, trade.target_owner_id] {
                NotificationService::notify_trade(
                    &mut tx,
                    recipient,
                    "Deposits funded",
                    "Both deposits are frozen in escrow. Ship your item and record the tracking number.",
                    trade.id,
                )
                .await?;
            }
        }

        trade.updated_at = Utc::now();
        Self::store(&mut tx, &trade).await?;
        tx.commit().await?;

        tracing::info!(
            trade_id = %trade.id,
            actor_id = %actor_id,
            points,
            %cash,
            "Trade deposit frozen"
        );

        self.to_response(trade).await
    }

    /// Record a shipment for one party: tracking number, timestamp, and the
    /// on-time-shipping credit bonus. Advances DEPOSIT_PAID -> SHIPPING on
    /// the first shipment and SHIPPING -> DELIVERED once both have shipped.
    pub async fn ship_item(
        &self,
        trade_id: Uuid,
        actor_id: Uuid,
        tracking_no: &str,
    ) -> Result<TradeResponse, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let mut trade = Self::fetch_for_update(&mut tx, trade_id).await?;

        if trade.trade_mode != TradeMode::Remote {
            return Err(ApiError::InvalidOperation(
                "In-person trades are not shipped".to_string(),
            ));
        }
        if trade.status != TradeStatus::DepositPaid && trade.status != TradeStatus::Shipping {
            return Err(ApiError::InvalidStateTransition(
                "Shipping is only possible once both deposits are paid".to_string(),
            ));
        }

        let party = trade
            .party_of(actor_id)
            .ok_or_else(|| ApiError::PermissionDenied("Not a party to this trade".to_string()))?;

        if trade.tracking_no_of(party).is_some() {
            return Err(ApiError::InvalidOperation(
                "Shipment already recorded".to_string(),
            ));
        }

        let now = Utc::now();
        match party {
            Party::Requester => {
                trade.requester_tracking_no = Some(tracking_no.to_string());
                trade.requester_shipped_at = Some(now);
            }
            Party::TargetOwner => {
                trade.target_tracking_no = Some(tracking_no.to_string());
                trade.target_shipped_at = Some(now);
            }
        }

        CreditService::on_time_ship(&mut tx, actor_id, trade.id).await?;

        if trade.status == TradeStatus::DepositPaid {
            trade.status = TradeStatus::Shipping;
        }
        if trade.requester_tracking_no.is_some() && trade.target_tracking_no.is_some() {
            trade.status = TradeStatus::Delivered;
        }

        let counterparty = trade.party_user_id(party.other());
        NotificationService::notify_trade(
            &mut tx,
            counterparty,
            "Counterparty has shipped",
            &format!("Tracking number: {}", tracking_no),
            trade.id,
        )
        .await?;

        trade.updated_at = now;
        Self::store(&mut tx, &trade).await?;
        tx.commit().await?;

        tracing::info!(trade_id = %trade.id, actor_id = %actor_id, "Shipment recorded");

        self.to_response(trade).await
    }

    /// Get a single trade request. Parties only.
    pub async fn get_trade(&self, trade_id: Uuid, actor_id: Uuid) -> Result<TradeResponse, ApiError> {
        let trade = sqlx::query_as::<_, TradeRequest>("SELECT * FROM trade_requests WHERE id = $1")
            .bind(trade_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Trade request not found".to_string()))?;

        if trade.party_of(actor_id).is_none() {
            return Err(ApiError::PermissionDenied(
                "Not a party to this trade".to_string(),
            ));
        }

        self.to_response(trade).await
    }

    /// Requests the actor initiated, newest first
    pub async fn list_sent(
        &self,
        actor_id: Uuid,
        page: i32,
        limit: i32,
    ) -> Result<Vec<TradeResponse>, ApiError> {
        self.list_by_column("requester_id", actor_id, page, limit).await
    }

    /// Requests targeting the actor's items, newest first
    pub async fn list_received(
        &self,
        actor_id: Uuid,
        page: i32,
        limit: i32,
    ) -> Result<Vec<TradeResponse>, ApiError> {
        self.list_by_column("target_owner_id", actor_id, page, limit).await
    }

    /// Read-only deposit quote: what paying a deposit on the given estimated
    /// value would cost the actor right now.
    pub async fn calculate_deposit(
        &self,
        actor_id: Uuid,
        estimated_value: Decimal,
    ) -> Result<DepositQuote, ApiError> {
        if estimated_value <= Decimal::ZERO {
            return Err(ApiError::InvalidOperation(
                "Estimated value must be positive".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await?;
        let actor = user::get_user(&mut tx, actor_id).await?;
        let wallet = WalletService::get_or_create_for_update(&mut tx, actor_id).await?;
        tx.commit().await?;

        let ratio = CreditTier::from_score(actor.credit_score).deposit_ratio();
        let total = estimated_value * ratio;
        let (points_needed, cash_needed) = split_deposit(total, wallet.available_points());

        Ok(DepositQuote {
            total_amount: total,
            ratio,
            points_needed,
            cash_needed,
            can_afford: cash_needed <= wallet.available_balance(),
        })
    }

    // ===== Transition branches =====

    async fn accept(
        conn: &mut PgConnection,
        trade: &mut TradeRequest,
        party: Party,
    ) -> Result<(), ApiError> {
        if party != Party::TargetOwner {
            return Err(ApiError::PermissionDenied(
                "Only the target owner can accept a request".to_string(),
            ));
        }

        if trade.trade_mode == TradeMode::Remote {
            let owner = user::get_user(&mut *conn, trade.target_owner_id).await?;
            if !CreditTier::from_score(owner.credit_score).can_remote_trade() {
                return Err(ApiError::PermissionDenied(
                    "Your credit tier does not allow remote trades".to_string(),
                ));
            }
        }

        let target_item = ItemService::get_for_update(&mut *conn, trade.target_item_id).await?;
        let offered_item = ItemService::get_for_update(&mut *conn, trade.offered_item_id).await?;

        if target_item.status != ItemStatus::Available || offered_item.status != ItemStatus::Available
        {
            return Err(ApiError::InvalidOperation(
                "One of the items is no longer available".to_string(),
            ));
        }

        ItemService::set_status(&mut *conn, trade.target_item_id, ItemStatus::Pending).await?;
        ItemService::set_status(&mut *conn, trade.offered_item_id, ItemStatus::Pending).await?;

        trade.status = TradeStatus::Accepted;
        Ok(())
    }

    /// First confirmation only marks the confirming party; the trade flips to
    /// COMPLETED with the second confirmation, which also swaps ownership,
    /// refunds deposits and awards credit in the same transaction.
    async fn confirm_completion(
        conn: &mut PgConnection,
        trade: &mut TradeRequest,
        party: Party,
    ) -> Result<(), ApiError> {
        let next = trade
            .confirmation()
            .confirm(party)
            .ok_or(ApiError::AlreadyConfirmed)?;

        match party {
            Party::Requester => trade.requester_confirmed = true,
            Party::TargetOwner => trade.target_confirmed = true,
        }

        if next == ConfirmationState::BothConfirmed {
            Self::finalize(conn, trade).await?;
        }

        Ok(())
    }

    async fn finalize(conn: &mut PgConnection, trade: &mut TradeRequest) -> Result<(), ApiError> {
        let now = Utc::now();

        // Lock both item rows before rewriting ownership
        ItemService::get_for_update(&mut *conn, trade.target_item_id).await?;
        ItemService::get_for_update(&mut *conn, trade.offered_item_id).await?;

        ItemService::transfer_ownership(
            &mut *conn,
            trade.target_item_id,
            trade.requester_id,
            trade.target_owner_id,
            trade.offered_item_id,
            now,
        )
        .await?;
        ItemService::transfer_ownership(
            &mut *conn,
            trade.offered_item_id,
            trade.target_owner_id,
            trade.requester_id,
            trade.target_item_id,
            now,
        )
        .await?;

        if trade.trade_mode == TradeMode::Remote {
            Self::refund_frozen_deposits(&mut *conn, trade.id).await?;
        }

        CreditService::on_trade_complete(&mut *conn, trade.requester_id, trade.id).await?;
        CreditService::on_trade_complete(&mut *conn, trade.target_owner_id, trade.id).await?;

        trade.status = TradeStatus::Completed;

        tracing::info!(trade_id = %trade.id, "Trade completed, ownership swapped");

        Ok(())
    }

    /// Cancellation policy. Held items are released; on a fully funded remote
    /// trade the cancelling party forfeits their deposit to the counterparty
    /// and takes the credit penalty, while a partially funded one only
    /// refunds whatever was frozen.
    async fn cancel(
        conn: &mut PgConnection,
        trade: &mut TradeRequest,
        party: Party,
    ) -> Result<(), ApiError> {
        let source = trade.status;
        let actor_id = trade.party_user_id(party);
        let counterparty_id = trade.party_user_id(party.other());

        if source != TradeStatus::Pending {
            ItemService::set_status(&mut *conn, trade.target_item_id, ItemStatus::Available).await?;
            ItemService::set_status(&mut *conn, trade.offered_item_id, ItemStatus::Available).await?;
        }

        if trade.trade_mode == TradeMode::Remote {
            if source == TradeStatus::DepositPaid {
                if let Some(deposit) = Self::frozen_deposit_of(&mut *conn, trade.id, actor_id).await? {
                    WalletService::forfeit(
                        &mut *conn,
                        actor_id,
                        counterparty_id,
                        deposit.points_amount,
                        deposit.cash_amount,
                        trade.id,
                    )
                    .await?;
                    Self::release_deposit(&mut *conn, deposit.id, DepositStatus::Forfeited).await?;
                }

                if let Some(deposit) =
                    Self::frozen_deposit_of(&mut *conn, trade.id, counterparty_id).await?
                {
                    WalletService::unfreeze(
                        &mut *conn,
                        counterparty_id,
                        deposit.points_amount,
                        deposit.cash_amount,
                        trade.id,
                    )
                    .await?;
                    Self::release_deposit(&mut *conn, deposit.id, DepositStatus::Refunded).await?;
                }

                CreditService::on_trade_cancel(&mut *conn, actor_id, trade.id).await?;
            } else if source == TradeStatus::Accepted {
                // No one defaulted on a funded agreement yet; just give back
                // whatever was frozen
                Self::refund_frozen_deposits(&mut *conn, trade.id).await?;
            }
        }

        let canceller = user::get_user(&mut *conn, actor_id).await?;
        NotificationService::notify_trade(
            &mut *conn,
            counterparty_id,
            "Trade cancelled",
            &format!("{} cancelled the trade request", canceller.username),
            trade.id,
        )
        .await?;

        trade.status = TradeStatus::Cancelled;
        Ok(())
    }

    // ===== Private Helper Methods =====

    async fn fetch_for_update(
        conn: &mut PgConnection,
        trade_id: Uuid,
    ) -> Result<TradeRequest, ApiError> {
        sqlx::query_as::<_, TradeRequest>("SELECT * FROM trade_requests WHERE id = $1 FOR UPDATE")
            .bind(trade_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| ApiError::NotFound("Trade request not found".to_string()))
    }

    async fn store(conn: &mut PgConnection, trade: &TradeRequest) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE trade_requests
            SET status = $1, requester_confirmed = $2, target_confirmed = $3,
                requester_deposit_paid = $4, target_deposit_paid = $5,
                requester_tracking_no = $6, target_tracking_no = $7,
                requester_shipped_at = $8, target_shipped_at = $9, updated_at = $10
            WHERE id = $11
            "#,
        )
        .bind(trade.status)
        .bind(trade.requester_confirmed)
        .bind(trade.target_confirmed)
        .bind(trade.requester_deposit_paid)
        .bind(trade.target_deposit_paid)
        .bind(&trade.requester_tracking_no)
        .bind(&trade.target_tracking_no)
        .bind(trade.requester_shipped_at)
        .bind(trade.target_shipped_at)
        .bind(trade.updated_at)
        .bind(trade.id)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn frozen_deposit_of(
        conn: &mut PgConnection,
        trade_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TradeDeposit>, ApiError> {
        let deposit = sqlx::query_as::<_, TradeDeposit>(
            r#"
            SELECT * FROM trade_deposits
            WHERE trade_request_id = $1 AND user_id = $2 AND status = $3
            "#,
        )
        .bind(trade_id)
        .bind(user_id)
        .bind(DepositStatus::Frozen)
        .fetch_optional(conn)
        .await?;

        Ok(deposit)
    }

    async fn refund_frozen_deposits(
        conn: &mut PgConnection,
        trade_id: Uuid,
    ) -> Result<(), ApiError> {
        let deposits = sqlx::query_as::<_, TradeDeposit>(
            "SELECT * FROM trade_deposits WHERE trade_request_id = $1 AND status = $2",
        )
        .bind(trade_id)
        .bind(DepositStatus::Frozen)
        .fetch_all(&mut *conn)
        .await?;

        for deposit in deposits {
            WalletService::unfreeze(
                &mut *conn,
                deposit.user_id,
                deposit.points_amount,
                deposit.cash_amount,
                trade_id,
            )
            .await?;
            Self::release_deposit(&mut *conn, deposit.id, DepositStatus::Refunded).await?;
        }

        Ok(())
    }

    async fn release_deposit(
        conn: &mut PgConnection,
        deposit_id: Uuid,
        status: DepositStatus,
    ) -> Result<(), ApiError> {
        sqlx::query("UPDATE trade_deposits SET status = $1, released_at = $2 WHERE id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(deposit_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    async fn list_by_column(
        &self,
        column: &str,
        actor_id: Uuid,
        page: i32,
        limit: i32,
    ) -> Result<Vec<TradeResponse>, ApiError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM trade_requests WHERE ");
        query_builder.push(column);
        query_builder.push(" = ");
        query_builder.push_bind(actor_id);
        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset as i64);

        let trades = query_builder
            .build_query_as::<TradeRequest>()
            .fetch_all(&self.db_pool)
            .await?;

        let mut responses = Vec::with_capacity(trades.len());
        for trade in trades {
            responses.push(self.to_response(trade).await?);
        }

        Ok(responses)
    }

    async fn to_response(&self, trade: TradeRequest) -> Result<TradeResponse, ApiError> {
        let target_item = self.item_service.get_item(trade.target_item_id).await?;
        let offered_item = self.item_service.get_item(trade.offered_item_id).await?;
        let requester = user::fetch_user(&self.db_pool, trade.requester_id).await?;

        Ok(TradeResponse {
            id: trade.id,
            target_item: target_item.into(),
            offered_item: offered_item.into(),
            requester: requester.into(),
            message: trade.message,
            status: trade.status,
            trade_mode: trade.trade_mode,
            estimated_value: trade.estimated_value,
            requester_confirmed: trade.requester_confirmed,
            target_confirmed: trade.target_confirmed,
            requester_deposit_paid: trade.requester_deposit_paid,
            target_deposit_paid: trade.target_deposit_paid,
            requester_tracking_no: trade.requester_tracking_no,
            target_tracking_no: trade.target_tracking_no,
            requester_shipped_at: trade.requester_shipped_at,
            target_shipped_at: trade.target_shipped_at,
            created_at: trade.created_at,
            updated_at: trade.updated_at,
        })
    }
}
