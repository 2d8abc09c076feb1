//! Process-wide keyed cache for lists and items.
//!
//! An explicit, injectable store: constructed at session startup and passed
//! by reference to the subscription manager and the mutation layer. Writers
//! replace whole arrays under the lock so readers always see a consistent
//! snapshot; a generation counter per key lets stale re-fetch results be
//! discarded (last-fetch-wins with scope check).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use korb_core::shopping::{CachedItem, ListRow};
use log::debug;

struct Scoped<T> {
    generation: u64,
    rows: Vec<T>,
}

// Derived Default would require T: Default, which the row types do not carry.
impl<T> Default for Scoped<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            rows: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Inner {
    lists: HashMap<String, Scoped<ListRow>>,
    items: HashMap<String, Scoped<CachedItem>>,
}

/// Keyed snapshot cache; cloning shares the underlying store.
#[derive(Clone, Default)]
pub struct CacheStore {
    inner: Arc<RwLock<Inner>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lists snapshot for a household; empty if never fetched.
    pub fn lists(&self, household_id: &str) -> Vec<ListRow> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .lists
            .get(household_id)
            .map(|scope| scope.rows.clone())
            .unwrap_or_default()
    }

    /// Current items snapshot for a list; empty if never fetched.
    pub fn items(&self, list_id: &str) -> Vec<CachedItem> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .items
            .get(list_id)
            .map(|scope| scope.rows.clone())
            .unwrap_or_default()
    }

    /// Atomically replace the lists array for a household with the result of
    /// `apply` over the current snapshot.
    pub fn update_lists(
        &self,
        household_id: &str,
        apply: impl FnOnce(&[ListRow]) -> Vec<ListRow>,
    ) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let scope = inner.lists.entry(household_id.to_string()).or_default();
        scope.rows = apply(&scope.rows);
    }

    /// Atomically replace the items array for a list with the result of
    /// `apply` over the current snapshot.
    pub fn update_items(
        &self,
        list_id: &str,
        apply: impl FnOnce(&[CachedItem]) -> Vec<CachedItem>,
    ) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let scope = inner.items.entry(list_id.to_string()).or_default();
        scope.rows = apply(&scope.rows);
    }

    /// Replace the lists array wholesale (mutation rollback path).
    pub fn replace_lists(&self, household_id: &str, rows: Vec<ListRow>) {
        self.update_lists(household_id, |_| rows);
    }

    /// Replace the items array wholesale (mutation rollback path).
    pub fn replace_items(&self, list_id: &str, rows: Vec<CachedItem>) {
        self.update_items(list_id, |_| rows);
    }

    /// Record the start of a lists re-fetch; the returned generation must be
    /// presented on completion.
    pub fn begin_lists_fetch(&self, household_id: &str) -> u64 {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .lists
            .get(household_id)
            .map(|scope| scope.generation)
            .unwrap_or(0)
    }

    /// Record the start of an items re-fetch.
    pub fn begin_items_fetch(&self, list_id: &str) -> u64 {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .items
            .get(list_id)
            .map(|scope| scope.generation)
            .unwrap_or(0)
    }

    /// Apply a completed lists fetch. Returns false when the scope was
    /// invalidated after the fetch began; the result is then discarded.
    pub fn complete_lists_fetch(
        &self,
        household_id: &str,
        generation: u64,
        rows: Vec<ListRow>,
    ) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let scope = inner.lists.entry(household_id.to_string()).or_default();
        if scope.generation != generation {
            debug!("Discarding stale lists fetch for household {household_id}");
            return false;
        }
        scope.rows = rows;
        true
    }

    /// Apply a completed items fetch, subject to the same generation check.
    pub fn complete_items_fetch(
        &self,
        list_id: &str,
        generation: u64,
        rows: Vec<CachedItem>,
    ) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let scope = inner.items.entry(list_id.to_string()).or_default();
        if scope.generation != generation {
            debug!("Discarding stale items fetch for list {list_id}");
            return false;
        }
        scope.rows = rows;
        true
    }

    /// Invalidate an items scope: in-flight fetches started before this call
    /// will be discarded on completion.
    pub fn invalidate_items(&self, list_id: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let scope = inner.items.entry(list_id.to_string()).or_default();
        scope.generation += 1;
    }

    /// Invalidate a lists scope.
    pub fn invalidate_lists(&self, household_id: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let scope = inner.lists.entry(household_id.to_string()).or_default();
        scope.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use korb_core::shopping::ItemRow;

    fn item(id: &str) -> CachedItem {
        CachedItem::from(ItemRow {
            id: id.to_string(),
            shopping_list_id: "list-1".to_string(),
            product_id: None,
            product_name: "Milch".to_string(),
            quantity: Some(1.0),
            unit: None,
            is_checked: false,
            priority: None,
            note: None,
            category_id: None,
            user_id: None,
            last_changed_by: None,
            created_at: "2026-02-01T10:00:00Z".to_string(),
            updated_at: "2026-02-01T10:00:00Z".to_string(),
        })
    }

    #[test]
    fn unknown_scopes_read_as_empty() {
        let store = CacheStore::new();
        assert!(store.lists("household-1").is_empty());
        assert!(store.items("list-1").is_empty());
    }

    #[test]
    fn first_write_to_a_scope_starts_from_an_empty_generation_zero_slot() {
        let store = CacheStore::new();
        store.update_lists("household-1", |current| {
            assert!(current.is_empty());
            vec![ListRow {
                id: "list-a".to_string(),
                household_id: "household-1".to_string(),
                created_by: None,
                name: "Einkaufsliste".to_string(),
                is_completed: false,
                created_at: "2026-02-01T10:00:00Z".to_string(),
                updated_at: "2026-02-01T10:00:00Z".to_string(),
            }]
        });
        assert_eq!(store.lists("household-1").len(), 1);
        assert_eq!(store.begin_lists_fetch("household-1"), 0);
    }

    #[test]
    fn update_items_replaces_the_whole_array() {
        let store = CacheStore::new();
        store.update_items("list-1", |current| {
            assert!(current.is_empty());
            vec![item("a")]
        });
        store.update_items("list-1", |current| {
            let mut next = current.to_vec();
            next.push(item("b"));
            next
        });
        assert_eq!(store.items("list-1").len(), 2);
    }

    #[test]
    fn stale_fetch_results_are_discarded_after_invalidation() {
        let store = CacheStore::new();
        let generation = store.begin_items_fetch("list-1");
        store.invalidate_items("list-1");

        assert!(!store.complete_items_fetch("list-1", generation, vec![item("a")]));
        assert!(store.items("list-1").is_empty());

        let fresh = store.begin_items_fetch("list-1");
        assert!(store.complete_items_fetch("list-1", fresh, vec![item("a")]));
        assert_eq!(store.items("list-1").len(), 1);
    }

    #[test]
    fn completed_fetch_replaces_scope_wholesale() {
        let store = CacheStore::new();
        store.replace_items("list-1", vec![item("a"), item("b")]);
        let generation = store.begin_items_fetch("list-1");
        assert!(store.complete_items_fetch("list-1", generation, vec![item("c")]));
        let rows = store.items("list-1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row.id, "c");
    }
}
