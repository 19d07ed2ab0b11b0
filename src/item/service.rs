//! Item registry service - availability state and ownership transfer
//!
//! The registry is the only writer of item status and ownership. The
//! connection-level operations are consumed by the trade state machine inside
//! its own transaction, so item holds stay serialized with the trade
//! transitions that cause them.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::item::model::{CreateItemRequest, Item, ItemCondition, ItemStatus, ListItemsQuery};

#[derive(Clone)]
pub struct ItemService {
    db_pool: PgPool,
}

impl ItemService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// List a new item, initially AVAILABLE
    pub async fn create_item(
        &self,
        owner_id: Uuid,
        request: CreateItemRequest,
    ) -> Result<Item, ApiError> {
        request.validate()?;

        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, owner_id, title, description, category, condition, status,
                               wanted_items, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category)
        .bind(request.condition.unwrap_or(ItemCondition::Good))
        .bind(ItemStatus::Available)
        .bind(&request.wanted_items)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(item_id = %item.id, owner_id = %owner_id, "Item listed");

        Ok(item)
    }

    /// Get a single item by id
    pub async fn get_item(&self, id: Uuid) -> Result<Item, ApiError> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
    }

    /// Browse available items with filtering and pagination
    pub async fn list_items(&self, query: ListItemsQuery) -> Result<Vec<Item>, ApiError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM items WHERE status = ");
        query_builder.push_bind(ItemStatus::Available);

        if let Some(category) = query.category {
            query_builder.push(" AND category = ");
            query_builder.push_bind(category);
        }
        if let Some(owner_id) = query.owner_id {
            query_builder.push(" AND owner_id = ");
            query_builder.push_bind(owner_id);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT ");
        query_builder.push_bind(limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset as i64);

        let items = query_builder
            .build_query_as::<Item>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(items)
    }

    /// Delist an item. Owner only; held or traded items cannot be removed.
    pub async fn remove_item(&self, actor_id: Uuid, id: Uuid) -> Result<Item, ApiError> {
        let mut tx = self.db_pool.begin().await?;

        let item = Self::get_for_update(&mut *tx, id).await?;

        if item.owner_id != actor_id {
            return Err(ApiError::PermissionDenied(
                "Only the owner can remove an item".to_string(),
            ));
        }
        if item.status != ItemStatus::Available {
            return Err(ApiError::InvalidOperation(
                "Only available items can be removed".to_string(),
            ));
        }

        Self::set_status(&mut *tx, id, ItemStatus::Removed).await?;
        tx.commit().await?;

        self.get_item(id).await
    }

    // ===== Registry operations consumed by the trade state machine =====

    /// Read an item with a row lock inside the caller's transaction.
    pub async fn get_for_update(conn: &mut PgConnection, id: Uuid) -> Result<Item, ApiError> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
    }

    /// Move an item to a new availability status.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: ItemStatus,
    ) -> Result<(), ApiError> {
        sqlx::query("UPDATE items SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Transfer ownership at trade completion, recording provenance: the
    /// previous owner, the item it was exchanged for, and when.
    pub async fn transfer_ownership(
        conn: &mut PgConnection,
        id: Uuid,
        new_owner_id: Uuid,
        previous_owner_id: Uuid,
        traded_for_item_id: Uuid,
        traded_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE items
            SET owner_id = $1, previous_owner_id = $2, traded_for_item_id = $3,
                traded_at = $4, status = $5, updated_at = $4
            WHERE id = $6
            "#,
        )
        .bind(new_owner_id)
        .bind(previous_owner_id)
        .bind(traded_for_item_id)
        .bind(traded_at)
        .bind(ItemStatus::Traded)
        .bind(id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
