//! Row snapshots for shopping lists and items, plus the change-feed event shape.

use serde::{Deserialize, Serialize};

/// A shopping list row as it exists in the backing store.
///
/// Timestamps are RFC3339 strings in store wire shape; parsing happens in the
/// comparator utilities, never in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: String,
    pub household_id: String,
    pub created_by: Option<String>,
    pub name: String,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A shopping list item row as it exists in the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRow {
    pub id: String,
    pub shopping_list_id: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub is_checked: bool,
    pub priority: Option<String>,
    pub note: Option<String>,
    pub category_id: Option<String>,
    pub user_id: Option<String>,
    pub last_changed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A fetch-time offer annotation attached to an unchecked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferHint {
    pub store: String,
    pub price_cents: i64,
    pub valid_until: Option<String>,
    pub score: f64,
}

/// Cache entry for an item: the store row plus cache-only fields.
///
/// The cache-only fields are never persisted and must survive every merge of
/// an authoritative row over this entry; only `row` is ever overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedItem {
    #[serde(flatten)]
    pub row: ItemRow,
    #[serde(skip)]
    pub optimistic: bool,
    #[serde(skip)]
    pub optimistic_inserted_at: Option<i64>,
    #[serde(default)]
    pub offer_hints: Vec<OfferHint>,
    #[serde(default)]
    pub editor_name: Option<String>,
}

impl CachedItem {
    /// Replace the store-backed row, leaving cache-only fields untouched.
    pub fn with_row(&self, row: ItemRow) -> Self {
        Self {
            row,
            ..self.clone()
        }
    }

    /// Replace the store-backed row and clear the optimistic markers.
    pub fn resolved_with(&self, row: ItemRow) -> Self {
        Self {
            row,
            optimistic: false,
            optimistic_inserted_at: None,
            ..self.clone()
        }
    }
}

impl From<ItemRow> for CachedItem {
    fn from(row: ItemRow) -> Self {
        Self {
            row,
            optimistic: false,
            optimistic_inserted_at: None,
            offer_hints: Vec::new(),
            editor_name: None,
        }
    }
}

/// Kind of a row-level change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Identity-only reference to the previous row state.
///
/// The feed guarantees the identity on DELETE only; on other events the old
/// snapshot may be partial or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRef {
    #[serde(default)]
    pub id: String,
}

/// One row-level notification from the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub new: Option<T>,
    pub old: Option<RowRef>,
}

impl<T> ChangeEvent<T> {
    pub fn insert(row: T) -> Self {
        Self {
            kind: ChangeKind::Insert,
            new: Some(row),
            old: None,
        }
    }

    pub fn update(row: T) -> Self {
        Self {
            kind: ChangeKind::Update,
            new: Some(row),
            old: None,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Delete,
            new: None,
            old: Some(RowRef { id: id.into() }),
        }
    }

    /// Identity of the deleted row, if the event carries one.
    pub fn deleted_id(&self) -> Option<&str> {
        self.old
            .as_ref()
            .map(|r| r.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_row() -> ItemRow {
        ItemRow {
            id: "item-1".to_string(),
            shopping_list_id: "list-1".to_string(),
            product_id: None,
            product_name: "Milch".to_string(),
            quantity: Some(1.0),
            unit: Some("l".to_string()),
            is_checked: false,
            priority: None,
            note: None,
            category_id: None,
            user_id: None,
            last_changed_by: None,
            created_at: "2026-02-01T10:00:00Z".to_string(),
            updated_at: "2026-02-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn with_row_keeps_cache_only_fields() {
        let cached = CachedItem {
            optimistic: true,
            optimistic_inserted_at: Some(1_000),
            offer_hints: vec![OfferHint {
                store: "Rewe".to_string(),
                price_cents: 99,
                valid_until: None,
                score: 0.8,
            }],
            editor_name: Some("Alex".to_string()),
            ..CachedItem::from(item_row())
        };

        let mut server_row = item_row();
        server_row.id = "server-1".to_string();
        let merged = cached.with_row(server_row.clone());

        assert_eq!(merged.row, server_row);
        assert!(merged.optimistic);
        assert_eq!(merged.offer_hints.len(), 1);
        assert_eq!(merged.editor_name.as_deref(), Some("Alex"));
    }

    #[test]
    fn resolved_with_clears_optimistic_markers() {
        let cached = CachedItem {
            optimistic: true,
            optimistic_inserted_at: Some(1_000),
            ..CachedItem::from(item_row())
        };

        let resolved = cached.resolved_with(item_row());
        assert!(!resolved.optimistic);
        assert_eq!(resolved.optimistic_inserted_at, None);
    }

    #[test]
    fn deleted_id_requires_non_empty_identity() {
        let event: ChangeEvent<ItemRow> = ChangeEvent::delete("item-1");
        assert_eq!(event.deleted_id(), Some("item-1"));

        let blank: ChangeEvent<ItemRow> = ChangeEvent {
            kind: ChangeKind::Delete,
            new: None,
            old: Some(RowRef::default()),
        };
        assert_eq!(blank.deleted_id(), None);
    }

    #[test]
    fn change_kind_uses_feed_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Insert).unwrap(),
            "\"INSERT\""
        );
        assert_eq!(
            serde_json::from_str::<ChangeKind>("\"DELETE\"").unwrap(),
            ChangeKind::Delete
        );
    }
}
