//! End-to-end lifecycle tests for the trade state machine

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use uuid::Uuid;

    use barterhub_server::error::ApiError;
    use barterhub_server::item::{CreateItemRequest, Item, ItemService, ItemStatus};
    use barterhub_server::trade::{
        CreateTradeRequest, TradeMode, TradeService, TradeStatus,
    };
    use barterhub_server::wallet::WalletService;

    /// Helper to create a test database pool with the schema applied
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/barterhub_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn services(pool: &PgPool) -> (TradeService, ItemService) {
        let item_service = ItemService::new(pool.clone());
        (
            TradeService::new(pool.clone(), item_service.clone()),
            item_service,
        )
    }

    async fn create_user(pool: &PgPool, credit_score: i32) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, username, credit_score) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(format!("user-{}", id.simple()))
            .bind(credit_score)
            .execute(pool)
            .await
            .expect("Failed to insert test user");
        id
    }

    async fn fund_wallet(pool: &PgPool, user_id: Uuid, points: i32, balance: Decimal) {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, points, balance)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET points = $3, balance = $4
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(points)
        .bind(balance)
        .execute(pool)
        .await
        .expect("Failed to fund test wallet");
    }

    async fn create_item(items: &ItemService, owner_id: Uuid, title: &str) -> Item {
        items
            .create_item(
                owner_id,
                CreateItemRequest {
                    title: title.to_string(),
                    description: None,
                    category: Some("books".to_string()),
                    condition: None,
                    wanted_items: None,
                },
            )
            .await
            .expect("Failed to create test item")
    }

    async fn fetch_item(pool: &PgPool, id: Uuid) -> Item {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .expect("Failed to fetch item")
    }

    async fn credit_score_of(pool: &PgPool, user_id: Uuid) -> i32 {
        sqlx::query_scalar("SELECT credit_score FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("Failed to fetch credit score")
    }

    async fn assert_wallet_invariants(pool: &PgPool, user_id: Uuid) {
        let mut conn = pool.acquire().await.unwrap();
        let wallet = WalletService::get_or_create_for_update(&mut conn, user_id)
            .await
            .expect("Failed to fetch wallet");

        assert!(wallet.frozen_points >= 0);
        assert!(wallet.points >= wallet.frozen_points);
        assert!(wallet.frozen_balance >= Decimal::ZERO);
        assert!(wallet.balance >= wallet.frozen_balance);
    }

    /// Scenario: in-person trade from creation through two-phase completion
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_in_person_trade_completes_and_swaps_ownership() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let requester = create_user(&pool, 100).await;
        let owner = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "camera").await;
        let offered = create_item(&items, requester, "guitar").await;

        let trade = trades
            .create_trade_request(
                requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered.id,
                    trade_mode: Some(TradeMode::InPerson),
                    estimated_value: None,
                    message: Some("swap?".to_string()),
                },
            )
            .await
            .expect("create should succeed");
        assert_eq!(trade.status, TradeStatus::Pending);

        let trade = trades
            .update_status(trade.id, owner, TradeStatus::Accepted)
            .await
            .expect("accept should succeed");
        assert_eq!(trade.status, TradeStatus::Accepted);
        assert_eq!(fetch_item(&pool, target.id).await.status, ItemStatus::Pending);
        assert_eq!(fetch_item(&pool, offered.id).await.status, ItemStatus::Pending);

        // First confirmation only marks the confirming party
        let trade = trades
            .update_status(trade.id, requester, TradeStatus::Completed)
            .await
            .expect("first confirmation should succeed");
        assert_eq!(trade.status, TradeStatus::Accepted);
        assert!(trade.requester_confirmed);
        assert!(!trade.target_confirmed);

        // Second confirmation finalizes
        let trade = trades
            .update_status(trade.id, owner, TradeStatus::Completed)
            .await
            .expect("second confirmation should succeed");
        assert_eq!(trade.status, TradeStatus::Completed);

        let target_after = fetch_item(&pool, target.id).await;
        let offered_after = fetch_item(&pool, offered.id).await;
        assert_eq!(target_after.status, ItemStatus::Traded);
        assert_eq!(offered_after.status, ItemStatus::Traded);
        assert_eq!(target_after.owner_id, requester);
        assert_eq!(offered_after.owner_id, owner);
        assert_eq!(target_after.previous_owner_id, Some(owner));
        assert_eq!(offered_after.previous_owner_id, Some(requester));
        assert_eq!(target_after.traded_for_item_id, Some(offered.id));

        // Both parties received the completion award
        assert_eq!(credit_score_of(&pool, requester).await, 105);
        assert_eq!(credit_score_of(&pool, owner).await, 105);
    }

    /// A confirmed party confirming again is rejected without side effects
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_double_confirmation_is_rejected() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let requester = create_user(&pool, 100).await;
        let owner = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "lamp").await;
        let offered = create_item(&items, requester, "kettle").await;

        let trade = trades
            .create_trade_request(
                requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered.id,
                    trade_mode: Some(TradeMode::InPerson),
                    estimated_value: None,
                    message: None,
                },
            )
            .await
            .unwrap();
        trades
            .update_status(trade.id, owner, TradeStatus::Accepted)
            .await
            .unwrap();
        trades
            .update_status(trade.id, requester, TradeStatus::Completed)
            .await
            .unwrap();

        let err = trades
            .update_status(trade.id, requester, TradeStatus::Completed)
            .await
            .expect_err("double confirmation must fail");
        assert!(matches!(err, ApiError::AlreadyConfirmed));

        // No additional mutation happened
        let after = trades.get_trade(trade.id, requester).await.unwrap();
        assert_eq!(after.status, TradeStatus::Accepted);
        assert!(after.requester_confirmed);
        assert!(!after.target_confirmed);
        assert_eq!(credit_score_of(&pool, requester).await, 100);
    }

    /// Scenario: a NEWBIE requester cannot open a remote trade
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_remote_trade_blocked_for_newbie() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let requester = create_user(&pool, 50).await;
        let owner = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "phone").await;
        let offered = create_item(&items, requester, "tablet").await;

        let err = trades
            .create_trade_request(
                requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered.id,
                    trade_mode: Some(TradeMode::Remote),
                    estimated_value: Some(dec!(100.00)),
                    message: None,
                },
            )
            .await
            .expect_err("newbie remote trade must fail");
        assert!(matches!(err, ApiError::PermissionDenied(_)));
    }

    /// Scenario: full remote flow - deposits, shipping, completion, refunds
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_remote_trade_full_flow() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let requester = create_user(&pool, 100).await;
        let owner = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "bicycle").await;
        let offered = create_item(&items, requester, "skateboard").await;

        // Requester covers half the deposit in points, the owner is all cash
        fund_wallet(&pool, requester, 5_000, dec!(100.00)).await;
        fund_wallet(&pool, owner, 0, dec!(150.00)).await;

        let trade = trades
            .create_trade_request(
                requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered.id,
                    trade_mode: Some(TradeMode::Remote),
                    estimated_value: Some(dec!(100.00)),
                    message: None,
                },
            )
            .await
            .unwrap();

        trades
            .update_status(trade.id, owner, TradeStatus::Accepted)
            .await
            .unwrap();

        // Both parties fund their deposits (tier NORMAL, ratio 1.0)
        let after_first = trades.pay_deposit(trade.id, requester).await.unwrap();
        assert_eq!(after_first.status, TradeStatus::Accepted);
        assert!(after_first.requester_deposit_paid);

        let after_second = trades.pay_deposit(trade.id, owner).await.unwrap();
        assert_eq!(after_second.status, TradeStatus::DepositPaid);

        let requester_wallet = sqlx::query_as::<_, barterhub_server::wallet::Wallet>(
            "SELECT * FROM wallets WHERE user_id = $1",
        )
        .bind(requester)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(requester_wallet.frozen_points, 5_000);
        assert_eq!(requester_wallet.frozen_balance, dec!(50.00));
        assert_wallet_invariants(&pool, requester).await;
        assert_wallet_invariants(&pool, owner).await;

        // Shipping advances DEPOSIT_PAID -> SHIPPING -> DELIVERED
        let shipped = trades
            .ship_item(trade.id, requester, "SF123456")
            .await
            .unwrap();
        assert_eq!(shipped.status, TradeStatus::Shipping);

        let shipped = trades.ship_item(trade.id, owner, "YT654321").await.unwrap();
        assert_eq!(shipped.status, TradeStatus::Delivered);

        // Both confirm receipt; deposits are refunded and ownership swaps
        trades
            .update_status(trade.id, requester, TradeStatus::Completed)
            .await
            .unwrap();
        let done = trades
            .update_status(trade.id, owner, TradeStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, TradeStatus::Completed);

        let requester_wallet = sqlx::query_as::<_, barterhub_server::wallet::Wallet>(
            "SELECT * FROM wallets WHERE user_id = $1",
        )
        .bind(requester)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(requester_wallet.frozen_points, 0);
        assert_eq!(requester_wallet.frozen_balance, Decimal::ZERO);
        assert_eq!(requester_wallet.points, 5_000);
        assert_eq!(requester_wallet.balance, dec!(100.00));

        assert_eq!(fetch_item(&pool, target.id).await.owner_id, requester);
        assert_eq!(fetch_item(&pool, offered.id).await.owner_id, owner);

        // +1 on-time shipping, +5 completion
        assert_eq!(credit_score_of(&pool, requester).await, 106);
        assert_eq!(credit_score_of(&pool, owner).await, 106);
    }

    /// Scenario: cancelling after DEPOSIT_PAID forfeits the canceller's
    /// deposit to the counterparty and penalizes their credit score
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_cancel_after_deposit_forfeits_to_counterparty() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let requester = create_user(&pool, 100).await;
        let owner = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "monitor").await;
        let offered = create_item(&items, requester, "keyboard").await;

        fund_wallet(&pool, requester, 0, dec!(100.00)).await;
        fund_wallet(&pool, owner, 0, dec!(100.00)).await;

        let trade = trades
            .create_trade_request(
                requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered.id,
                    trade_mode: Some(TradeMode::Remote),
                    estimated_value: Some(dec!(100.00)),
                    message: None,
                },
            )
            .await
            .unwrap();

        trades
            .update_status(trade.id, owner, TradeStatus::Accepted)
            .await
            .unwrap();
        trades.pay_deposit(trade.id, requester).await.unwrap();
        trades.pay_deposit(trade.id, owner).await.unwrap();

        // The target owner walks away
        let cancelled = trades
            .update_status(trade.id, owner, TradeStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TradeStatus::Cancelled);

        // Items are released
        assert_eq!(fetch_item(&pool, target.id).await.status, ItemStatus::Available);
        assert_eq!(fetch_item(&pool, offered.id).await.status, ItemStatus::Available);

        // The violator's deposit moved to the requester, whose own deposit
        // was refunded
        let requester_wallet = sqlx::query_as::<_, barterhub_server::wallet::Wallet>(
            "SELECT * FROM wallets WHERE user_id = $1",
        )
        .bind(requester)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(requester_wallet.balance, dec!(200.00));
        assert_eq!(requester_wallet.frozen_balance, Decimal::ZERO);

        let owner_wallet = sqlx::query_as::<_, barterhub_server::wallet::Wallet>(
            "SELECT * FROM wallets WHERE user_id = $1",
        )
        .bind(owner)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(owner_wallet.balance, Decimal::ZERO);
        assert_eq!(owner_wallet.frozen_balance, Decimal::ZERO);

        assert_eq!(credit_score_of(&pool, owner).await, 90);
        assert_eq!(credit_score_of(&pool, requester).await, 100);

        assert_wallet_invariants(&pool, requester).await;
        assert_wallet_invariants(&pool, owner).await;
    }

    /// Two accepted trades must not both hold the same item
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_second_accept_on_held_item_fails() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let owner = create_user(&pool, 100).await;
        let first_requester = create_user(&pool, 100).await;
        let second_requester = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "record player").await;
        let offered_a = create_item(&items, first_requester, "speakers").await;
        let offered_b = create_item(&items, second_requester, "headphones").await;

        let first = trades
            .create_trade_request(
                first_requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered_a.id,
                    trade_mode: Some(TradeMode::InPerson),
                    estimated_value: None,
                    message: None,
                },
            )
            .await
            .unwrap();
        let second = trades
            .create_trade_request(
                second_requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered_b.id,
                    trade_mode: Some(TradeMode::InPerson),
                    estimated_value: None,
                    message: None,
                },
            )
            .await
            .unwrap();

        trades
            .update_status(first.id, owner, TradeStatus::Accepted)
            .await
            .unwrap();

        let err = trades
            .update_status(second.id, owner, TradeStatus::Accepted)
            .await
            .expect_err("second accept must fail while the item is held");
        assert!(matches!(err, ApiError::InvalidOperation(_)));
    }

    /// A stranger to the trade cannot drive it
    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_non_party_is_rejected() {
        let pool = setup_test_db().await;
        let (trades, items) = services(&pool);

        let requester = create_user(&pool, 100).await;
        let owner = create_user(&pool, 100).await;
        let stranger = create_user(&pool, 100).await;
        let target = create_item(&items, owner, "desk").await;
        let offered = create_item(&items, requester, "chair").await;

        let trade = trades
            .create_trade_request(
                requester,
                CreateTradeRequest {
                    target_item_id: target.id,
                    offered_item_id: offered.id,
                    trade_mode: Some(TradeMode::InPerson),
                    estimated_value: None,
                    message: None,
                },
            )
            .await
            .unwrap();

        let err = trades
            .update_status(trade.id, stranger, TradeStatus::Accepted)
            .await
            .expect_err("stranger must be rejected");
        assert!(matches!(err, ApiError::PermissionDenied(_)));
    }

    #[test]
    fn test_trade_status_serialization() {
        let statuses = vec![
            TradeStatus::Pending,
            TradeStatus::Accepted,
            TradeStatus::DepositPaid,
            TradeStatus::Shipping,
            TradeStatus::Delivered,
            TradeStatus::Completed,
            TradeStatus::Rejected,
            TradeStatus::Cancelled,
        ];

        assert_eq!(statuses.len(), 8);

        for status in statuses {
            let json = serde_json::to_string(&status).unwrap();
            assert!(!json.is_empty());
        }

        assert_eq!(
            serde_json::to_string(&TradeStatus::DepositPaid).unwrap(),
            "\"DEPOSIT_PAID\""
        );
    }
}
