//! Optimistic mutation layer: every write edits the cache ahead of the
//! network call, reconciles the cache with the server row on success, and
//! restores the pre-mutation snapshot on failure.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use korb_core::shopping::{merge_list_event, CachedItem, ChangeEvent, ItemRow, ListRow};

use crate::backend::{ItemChanges, NewItem, NewList, ShoppingBackend};
use crate::error::{RealtimeError, Result};
use crate::store::CacheStore;

/// Which mutation committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    AddItem,
    UpdateItem,
    DeleteItem,
    MoveItem,
    CreateList,
    ClearCheckedItems,
}

/// Dispatched to registered hooks after a mutation commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNotice {
    pub kind: MutationKind,
    pub household_id: Option<String>,
    pub list_id: Option<String>,
    pub row_id: Option<String>,
}

/// Runs after a successful mutation. Hook failures are logged and never
/// affect the committed mutation.
#[async_trait]
pub trait PostCommitHook: Send + Sync {
    async fn on_commit(&self, notice: CommitNotice) -> Result<()>;
}

/// Cache-first mutations over a [`ShoppingBackend`].
pub struct MutationService {
    store: CacheStore,
    backend: Arc<dyn ShoppingBackend>,
    hooks: Vec<Arc<dyn PostCommitHook>>,
}

impl MutationService {
    pub fn new(store: CacheStore, backend: Arc<dyn ShoppingBackend>) -> Self {
        Self {
            store,
            backend,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostCommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Append an optimistic row, then insert. On success the optimistic row
    /// is replaced by its recorded id with the server row; on failure the
    /// pre-mutation snapshot is restored.
    pub async fn add_item(&self, input: NewItem) -> Result<ItemRow> {
        if input.product_name.trim().is_empty() {
            return Err(RealtimeError::invalid_input("product name is empty"));
        }
        // The quantity default goes into the write itself, not just the
        // optimistic row, so cache and store agree on the inserted row.
        let mut input = input;
        input.quantity = input.quantity.or(Some(1.0));
        let list_id = input.shopping_list_id.clone();
        let snapshot = self.store.items(&list_id);

        let optimistic_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        let optimistic = CachedItem {
            row: ItemRow {
                id: optimistic_id.clone(),
                shopping_list_id: list_id.clone(),
                product_id: None,
                product_name: input.product_name.clone(),
                quantity: input.quantity,
                unit: input.unit.clone(),
                is_checked: false,
                priority: None,
                note: None,
                category_id: None,
                user_id: None,
                last_changed_by: None,
                created_at: stamp.clone(),
                updated_at: stamp,
            },
            optimistic: true,
            optimistic_inserted_at: Some(now.timestamp_millis()),
            offer_hints: Vec::new(),
            editor_name: None,
        };
        self.store.update_items(&list_id, |current| {
            let mut next = current.to_vec();
            next.push(optimistic);
            next
        });

        match self.backend.insert_item(input).await {
            Ok(server_row) => {
                self.store.update_items(&list_id, |current| {
                    current
                        .iter()
                        .map(|entry| {
                            if entry.row.id == optimistic_id {
                                entry.resolved_with(server_row.clone())
                            } else {
                                entry.clone()
                            }
                        })
                        .collect()
                });
                self.notify(CommitNotice {
                    kind: MutationKind::AddItem,
                    household_id: None,
                    list_id: Some(list_id),
                    row_id: Some(server_row.id.clone()),
                });
                Ok(server_row)
            }
            Err(err) => {
                self.store.replace_items(&list_id, snapshot);
                Err(err)
            }
        }
    }

    /// Apply the changes to the cached row, then write. Success reconciles
    /// the server row so server-side timestamps land in the cache.
    pub async fn update_item(
        &self,
        list_id: &str,
        item_id: &str,
        changes: ItemChanges,
    ) -> Result<ItemRow> {
        let snapshot = self.store.items(list_id);
        self.store.update_items(list_id, |current| {
            current
                .iter()
                .map(|entry| {
                    if entry.row.id == item_id {
                        entry.with_row(changes.applied_to(&entry.row))
                    } else {
                        entry.clone()
                    }
                })
                .collect()
        });

        match self.backend.update_item(item_id, changes).await {
            Ok(server_row) => {
                self.store.update_items(list_id, |current| {
                    current
                        .iter()
                        .map(|entry| {
                            if entry.row.id == item_id {
                                entry.with_row(server_row.clone())
                            } else {
                                entry.clone()
                            }
                        })
                        .collect()
                });
                self.notify(CommitNotice {
                    kind: MutationKind::UpdateItem,
                    household_id: None,
                    list_id: Some(list_id.to_string()),
                    row_id: Some(server_row.id.clone()),
                });
                Ok(server_row)
            }
            Err(err) => {
                self.store.replace_items(list_id, snapshot);
                Err(err)
            }
        }
    }

    pub async fn delete_item(&self, list_id: &str, item_id: &str) -> Result<()> {
        let snapshot = self.store.items(list_id);
        self.store.update_items(list_id, |current| {
            current
                .iter()
                .filter(|entry| entry.row.id != item_id)
                .cloned()
                .collect()
        });

        match self.backend.delete_item(item_id).await {
            Ok(()) => {
                self.notify(CommitNotice {
                    kind: MutationKind::DeleteItem,
                    household_id: None,
                    list_id: Some(list_id.to_string()),
                    row_id: Some(item_id.to_string()),
                });
                Ok(())
            }
            Err(err) => {
                self.store.replace_items(list_id, snapshot);
                Err(err)
            }
        }
    }

    /// Remove from the source scope, move on the server, then re-fetch the
    /// destination scope. A failed destination fetch only warns; the
    /// destination's own subscription heals it.
    pub async fn move_item(
        &self,
        source_list_id: &str,
        item_id: &str,
        target_list_id: &str,
    ) -> Result<()> {
        let snapshot = self.store.items(source_list_id);
        self.store.update_items(source_list_id, |current| {
            current
                .iter()
                .filter(|entry| entry.row.id != item_id)
                .cloned()
                .collect()
        });

        match self.backend.move_item(item_id, target_list_id).await {
            Ok(()) => {
                self.store.invalidate_items(target_list_id);
                let generation = self.store.begin_items_fetch(target_list_id);
                match self.backend.fetch_items(target_list_id).await {
                    Ok(rows) => {
                        let _ = self.store.complete_items_fetch(target_list_id, generation, rows);
                    }
                    Err(err) => {
                        warn!("Destination fetch after move failed for list {target_list_id}: {err}");
                    }
                }
                self.notify(CommitNotice {
                    kind: MutationKind::MoveItem,
                    household_id: None,
                    list_id: Some(target_list_id.to_string()),
                    row_id: Some(item_id.to_string()),
                });
                Ok(())
            }
            Err(err) => {
                self.store.replace_items(source_list_id, snapshot);
                Err(err)
            }
        }
    }

    /// Prepend an optimistic list, then insert. Reconciliation goes through
    /// the merge upsert so an independently arriving feed INSERT of the same
    /// row cannot duplicate it.
    pub async fn create_list(&self, input: NewList) -> Result<ListRow> {
        if input.name.trim().is_empty() {
            return Err(RealtimeError::invalid_input("list name is empty"));
        }
        let household_id = input.household_id.clone();
        let snapshot = self.store.lists(&household_id);

        let optimistic_id = Uuid::new_v4().to_string();
        let stamp = Utc::now().to_rfc3339();
        let optimistic = ListRow {
            id: optimistic_id.clone(),
            household_id: household_id.clone(),
            created_by: None,
            name: input.name.clone(),
            is_completed: false,
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        self.store.update_lists(&household_id, |current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(optimistic);
            next.extend_from_slice(current);
            next
        });

        match self.backend.insert_list(input).await {
            Ok(server_row) => {
                self.store.update_lists(&household_id, |current| {
                    let without_placeholder: Vec<ListRow> = current
                        .iter()
                        .filter(|list| list.id != optimistic_id)
                        .cloned()
                        .collect();
                    merge_list_event(
                        &without_placeholder,
                        &ChangeEvent::insert(server_row.clone()),
                    )
                });
                self.notify(CommitNotice {
                    kind: MutationKind::CreateList,
                    household_id: Some(household_id),
                    list_id: Some(server_row.id.clone()),
                    row_id: Some(server_row.id.clone()),
                });
                Ok(server_row)
            }
            Err(err) => {
                self.store.replace_lists(&household_id, snapshot);
                Err(err)
            }
        }
    }

    /// Delete every checked item in a list, best effort. Failed deletes are
    /// logged and skipped; the scope's next re-fetch restores any survivors.
    /// Returns the number of items actually deleted.
    pub async fn clear_checked_items(&self, list_id: &str) -> Result<usize> {
        let checked: Vec<String> = self
            .store
            .items(list_id)
            .iter()
            .filter(|entry| entry.row.is_checked)
            .map(|entry| entry.row.id.clone())
            .collect();
        if checked.is_empty() {
            return Ok(0);
        }

        self.store.update_items(list_id, |current| {
            current
                .iter()
                .filter(|entry| !entry.row.is_checked)
                .cloned()
                .collect()
        });

        let mut deleted = 0;
        for id in &checked {
            match self.backend.delete_item(id).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!("Clearing checked item {id} failed: {err}"),
            }
        }
        if deleted > 0 {
            self.notify(CommitNotice {
                kind: MutationKind::ClearCheckedItems,
                household_id: None,
                list_id: Some(list_id.to_string()),
                row_id: None,
            });
        }
        Ok(deleted)
    }

    fn notify(&self, notice: CommitNotice) {
        for hook in &self.hooks {
            let hook = hook.clone();
            let notice = notice.clone();
            tokio::spawn(async move {
                if let Err(err) = hook.on_commit(notice).await {
                    warn!("Post-commit hook failed: {err}");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::time::sleep;

    use crate::error::Result;

    fn item_row(id: &str, name: &str, checked: bool) -> ItemRow {
        ItemRow {
            id: id.to_string(),
            shopping_list_id: "list-1".to_string(),
            product_id: None,
            product_name: name.to_string(),
            quantity: Some(1.0),
            unit: None,
            is_checked: checked,
            priority: None,
            note: None,
            category_id: None,
            user_id: None,
            last_changed_by: None,
            created_at: "2026-02-01T10:00:00Z".to_string(),
            updated_at: "2026-02-01T10:00:00Z".to_string(),
        }
    }

    /// Backend echoing mutations back as server rows, with a failure switch.
    #[derive(Default)]
    struct MockBackend {
        fail: AtomicBool,
        deleted: Mutex<Vec<String>>,
        fetched_items: Mutex<Vec<CachedItem>>,
    }

    impl MockBackend {
        fn failing() -> Self {
            let backend = Self::default();
            backend.fail.store(true, Ordering::SeqCst);
            backend
        }

        fn guard(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(RealtimeError::backend("mock failure"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ShoppingBackend for MockBackend {
        async fn fetch_lists(&self, _household_id: &str) -> Result<Vec<ListRow>> {
            self.guard()?;
            Ok(Vec::new())
        }

        async fn fetch_items(&self, _list_id: &str) -> Result<Vec<CachedItem>> {
            self.guard()?;
            Ok(self.fetched_items.lock().unwrap().clone())
        }

        async fn insert_list(&self, input: NewList) -> Result<ListRow> {
            self.guard()?;
            Ok(ListRow {
                id: "server-list-1".to_string(),
                household_id: input.household_id,
                created_by: Some("user-1".to_string()),
                name: input.name,
                is_completed: false,
                created_at: "2026-02-01T12:00:00Z".to_string(),
                updated_at: "2026-02-01T12:00:00Z".to_string(),
            })
        }

        async fn insert_item(&self, input: NewItem) -> Result<ItemRow> {
            self.guard()?;
            Ok(ItemRow {
                id: "server-item-1".to_string(),
                shopping_list_id: input.shopping_list_id,
                product_id: None,
                product_name: input.product_name,
                quantity: input.quantity,
                unit: input.unit,
                is_checked: false,
                priority: None,
                note: None,
                category_id: None,
                user_id: Some("user-1".to_string()),
                last_changed_by: None,
                created_at: "2026-02-01T12:00:00Z".to_string(),
                updated_at: "2026-02-01T12:00:00Z".to_string(),
            })
        }

        async fn update_item(&self, id: &str, changes: ItemChanges) -> Result<ItemRow> {
            self.guard()?;
            let mut row = changes.applied_to(&item_row(id, "Milch", false));
            row.updated_at = "2026-02-01T12:30:00Z".to_string();
            Ok(row)
        }

        async fn delete_item(&self, id: &str) -> Result<()> {
            self.guard()?;
            self.deleted.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn move_item(&self, _id: &str, _target_list_id: &str) -> Result<()> {
            self.guard()?;
            Ok(())
        }
    }

    fn service(backend: Arc<MockBackend>) -> (CacheStore, MutationService) {
        let store = CacheStore::new();
        let service = MutationService::new(store.clone(), backend);
        (store, service)
    }

    fn seed_items(store: &CacheStore, rows: Vec<ItemRow>) {
        store.replace_items("list-1", rows.into_iter().map(CachedItem::from).collect());
    }

    #[tokio::test]
    async fn add_item_reconciles_the_optimistic_row_by_its_recorded_id() {
        let (store, service) = service(Arc::new(MockBackend::default()));

        let server_row = service
            .add_item(NewItem {
                shopping_list_id: "list-1".to_string(),
                product_name: "Milch".to_string(),
                quantity: None,
                unit: None,
            })
            .await
            .unwrap();

        assert_eq!(server_row.id, "server-item-1");
        assert_eq!(server_row.quantity, Some(1.0));
        let cached = store.items("list-1");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].row.id, "server-item-1");
        // The defaulted quantity reached the store, so the cached row and
        // the server row agree.
        assert_eq!(cached[0].row.quantity, Some(1.0));
        assert!(!cached[0].optimistic);
        assert_eq!(cached[0].optimistic_inserted_at, None);
    }

    #[tokio::test]
    async fn add_item_failure_restores_the_pre_mutation_snapshot() {
        let (store, service) = service(Arc::new(MockBackend::failing()));
        seed_items(&store, vec![item_row("existing", "Brot", false)]);

        let result = service
            .add_item(NewItem {
                shopping_list_id: "list-1".to_string(),
                product_name: "Milch".to_string(),
                quantity: Some(2.0),
                unit: None,
            })
            .await;

        assert!(result.is_err());
        let cached = store.items("list-1");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].row.id, "existing");
    }

    #[tokio::test]
    async fn add_item_rejects_a_blank_name_without_touching_the_cache() {
        let (store, service) = service(Arc::new(MockBackend::default()));

        let result = service
            .add_item(NewItem {
                shopping_list_id: "list-1".to_string(),
                product_name: "   ".to_string(),
                quantity: None,
                unit: None,
            })
            .await;

        assert!(matches!(result, Err(RealtimeError::InvalidInput(_))));
        assert!(store.items("list-1").is_empty());
    }

    #[tokio::test]
    async fn update_item_picks_up_server_timestamps() {
        let (store, service) = service(Arc::new(MockBackend::default()));
        seed_items(&store, vec![item_row("item-1", "Milch", false)]);

        let server_row = service
            .update_item("list-1", "item-1", ItemChanges::checked(true))
            .await
            .unwrap();

        assert!(server_row.is_checked);
        let cached = store.items("list-1");
        assert_eq!(cached[0].row.updated_at, "2026-02-01T12:30:00Z");
        assert!(cached[0].row.is_checked);
    }

    #[tokio::test]
    async fn update_item_failure_rolls_back() {
        let (store, service) = service(Arc::new(MockBackend::failing()));
        seed_items(&store, vec![item_row("item-1", "Milch", false)]);

        let result = service
            .update_item("list-1", "item-1", ItemChanges::checked(true))
            .await;

        assert!(result.is_err());
        assert!(!store.items("list-1")[0].row.is_checked);
    }

    #[tokio::test]
    async fn delete_item_removes_the_row_and_calls_the_backend() {
        let backend = Arc::new(MockBackend::default());
        let (store, service) = service(backend.clone());
        seed_items(&store, vec![item_row("item-1", "Milch", false)]);

        service.delete_item("list-1", "item-1").await.unwrap();

        assert!(store.items("list-1").is_empty());
        assert_eq!(backend.deleted.lock().unwrap().as_slice(), ["item-1"]);
    }

    #[tokio::test]
    async fn move_item_refetches_the_destination_scope() {
        let backend = Arc::new(MockBackend::default());
        let mut moved = item_row("item-1", "Milch", false);
        moved.shopping_list_id = "list-2".to_string();
        backend
            .fetched_items
            .lock()
            .unwrap()
            .push(CachedItem::from(moved));
        let (store, service) = service(backend);
        seed_items(&store, vec![item_row("item-1", "Milch", false)]);

        service.move_item("list-1", "item-1", "list-2").await.unwrap();

        assert!(store.items("list-1").is_empty());
        let destination = store.items("list-2");
        assert_eq!(destination.len(), 1);
        assert_eq!(destination[0].row.shopping_list_id, "list-2");
    }

    #[tokio::test]
    async fn create_list_cannot_duplicate_against_a_feed_insert() {
        let (store, service) = service(Arc::new(MockBackend::default()));
        // The change feed delivered the server row before the insert returned.
        store.replace_lists(
            "household-1",
            vec![ListRow {
                id: "server-list-1".to_string(),
                household_id: "household-1".to_string(),
                created_by: Some("user-1".to_string()),
                name: "Wocheneinkauf".to_string(),
                is_completed: false,
                created_at: "2026-02-01T12:00:00Z".to_string(),
                updated_at: "2026-02-01T12:00:00Z".to_string(),
            }],
        );

        let server_row = service
            .create_list(NewList {
                household_id: "household-1".to_string(),
                name: "Wocheneinkauf".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(server_row.id, "server-list-1");
        assert_eq!(store.lists("household-1").len(), 1);
    }

    #[tokio::test]
    async fn clear_checked_items_deletes_only_checked_rows() {
        let backend = Arc::new(MockBackend::default());
        let (store, service) = service(backend.clone());
        seed_items(
            &store,
            vec![
                item_row("item-1", "Milch", true),
                item_row("item-2", "Brot", false),
                item_row("item-3", "Eier", true),
            ],
        );

        let deleted = service.clear_checked_items("list-1").await.unwrap();

        assert_eq!(deleted, 2);
        let remaining = store.items("list-1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].row.id, "item-2");
        assert_eq!(
            backend.deleted.lock().unwrap().as_slice(),
            ["item-1", "item-3"]
        );
    }

    struct CountingHook {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PostCommitHook for CountingHook {
        async fn on_commit(&self, _notice: CommitNotice) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RealtimeError::backend("hook failure"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn hooks_run_after_commit_and_failures_do_not_roll_back() {
        let hook = Arc::new(CountingHook {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let store = CacheStore::new();
        let service = MutationService::new(store.clone(), Arc::new(MockBackend::default()))
            .with_hook(hook.clone());
        seed_items(&store, vec![item_row("item-1", "Milch", false)]);

        service.delete_item("list-1", "item-1").await.unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
        assert!(store.items("list-1").is_empty());
    }
}
