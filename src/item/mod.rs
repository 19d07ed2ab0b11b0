//! Item registry - availability state and ownership of tradeable items

pub mod model;
pub mod service;

pub use model::{CreateItemRequest, Item, ItemCondition, ItemStatus, ItemSummary, ListItemsQuery};
pub use service::ItemService;
