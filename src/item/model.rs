//! Item models and data structures for the BarterHub registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Item model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Item {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: ItemCondition,
    pub status: ItemStatus,
    /// Free-text wishlist of what the owner wants in exchange
    pub wanted_items: Option<String>,
    pub previous_owner_id: Option<Uuid>,
    pub traded_for_item_id: Option<Uuid>,
    pub traded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Physical condition of an item
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_condition", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

/// Availability state of an item
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "item_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Open to trade requests
    Available,
    /// Held by an accepted trade
    Pending,
    /// Ownership transferred by a completed trade
    Traded,
    /// Delisted by its owner
    Removed,
}

/// Compact item projection embedded in trade responses
#[derive(Debug, Serialize, Clone)]
pub struct ItemSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub condition: ItemCondition,
    pub status: ItemStatus,
}

impl From<Item> for ItemSummary {
    fn from(item: Item) -> Self {
        ItemSummary {
            id: item.id,
            owner_id: item.owner_id,
            title: item.title,
            category: item.category,
            condition: item.condition,
            status: item.status,
        }
    }
}

/// Request DTO for listing an item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 64))]
    pub category: Option<String>,
    pub condition: Option<ItemCondition>,
    #[validate(length(max = 4000))]
    pub wanted_items: Option<String>,
}

/// Query parameters for browsing available items
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<String>,
    pub owner_id: Option<Uuid>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
