//! Contracts for the backing store and the change-feed transport.
//!
//! Implementations live outside this crate (HTTP, database driver, test
//! doubles). Relational joins are normalized at this boundary: `fetch_items`
//! returns rows already enriched with exactly one optional editor profile
//! and the computed offer hints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use korb_core::shopping::{CachedItem, ChangeEvent, ItemRow, ListRow};

use crate::error::Result;

/// Input for creating a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewList {
    pub household_id: String,
    pub name: String,
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub shopping_list_id: String,
    pub product_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

/// Partial update for an item; unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    pub product_name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub is_checked: Option<bool>,
    pub priority: Option<String>,
    pub note: Option<String>,
}

impl ItemChanges {
    pub fn checked(value: bool) -> Self {
        Self {
            is_checked: Some(value),
            ..Self::default()
        }
    }

    /// Project the changes onto a row, for the optimistic cache update.
    pub fn applied_to(&self, row: &ItemRow) -> ItemRow {
        let mut next = row.clone();
        if let Some(name) = &self.product_name {
            next.product_name = name.clone();
        }
        if let Some(quantity) = self.quantity {
            next.quantity = Some(quantity);
        }
        if let Some(unit) = &self.unit {
            next.unit = Some(unit.clone());
        }
        if let Some(is_checked) = self.is_checked {
            next.is_checked = is_checked;
        }
        if let Some(priority) = &self.priority {
            next.priority = Some(priority.clone());
        }
        if let Some(note) = &self.note {
            next.note = Some(note.clone());
        }
        next
    }
}

/// Query and mutation interface of the backing store.
#[async_trait]
pub trait ShoppingBackend: Send + Sync {
    /// Current lists for a household, ordered as stored.
    async fn fetch_lists(&self, household_id: &str) -> Result<Vec<ListRow>>;

    /// Current items for a list, enriched with offer hints and editor names.
    async fn fetch_items(&self, list_id: &str) -> Result<Vec<CachedItem>>;

    async fn insert_list(&self, input: NewList) -> Result<ListRow>;
    async fn insert_item(&self, input: NewItem) -> Result<ItemRow>;
    async fn update_item(&self, id: &str, changes: ItemChanges) -> Result<ItemRow>;
    async fn delete_item(&self, id: &str) -> Result<()>;
    async fn move_item(&self, id: &str, target_list_id: &str) -> Result<()>;
}

/// A live change-feed subscription. Dropping it tears the channel down; the
/// transport ends the stream by closing the sender.
pub struct FeedSubscription<T> {
    pub events: mpsc::Receiver<ChangeEvent<T>>,
}

/// Scope-filtered change-feed subscriptions.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe_lists(&self, household_id: &str) -> Result<FeedSubscription<ListRow>>;
    async fn subscribe_items(&self, list_id: &str) -> Result<FeedSubscription<ItemRow>>;
}
