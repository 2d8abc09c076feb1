//! Subscription manager: owns the long-lived change-feed subscriptions and
//! folds every pushed event into the cache.
//!
//! One lists subscription per active household, one items subscription per
//! active list. Each received event is merged synchronously into the store,
//! then a supplementary full re-fetch is scheduled to repair relational and
//! derived fields the row-level event cannot carry. Re-fetches are
//! last-fetch-wins via the store's generation check, and bursts coalesce
//! into the fetch already in flight.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use korb_core::shopping::{merge_item_event, merge_list_event};

use crate::backend::{ChangeFeed, ShoppingBackend};
use crate::error::Result;
use crate::store::CacheStore;

// Re-fetch gate per scope. An event arriving while a fetch is in flight
// must not be lost: the fetch that is running started before that event
// committed, so its result can be a pre-event snapshot. RERUN asks the
// running worker for exactly one trailing fetch.
const REFETCH_IDLE: u8 = 0;
const REFETCH_RUNNING: u8 = 1;
const REFETCH_RERUN: u8 = 2;

/// Lifecycle of one scoped subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

struct ScopeTask {
    key: String,
    state: Arc<Mutex<SubscriptionState>>,
    task: JoinHandle<()>,
}

impl ScopeTask {
    fn teardown(self) {
        self.task.abort();
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = SubscriptionState::Unsubscribed;
    }
}

/// Owns the household-scoped lists feed and the list-scoped items feed.
pub struct SubscriptionManager {
    store: CacheStore,
    backend: Arc<dyn ShoppingBackend>,
    feed: Arc<dyn ChangeFeed>,
    lists_scope: AsyncMutex<Option<ScopeTask>>,
    items_scope: AsyncMutex<Option<ScopeTask>>,
}

impl SubscriptionManager {
    pub fn new(
        store: CacheStore,
        backend: Arc<dyn ShoppingBackend>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self {
            store,
            backend,
            feed,
            lists_scope: AsyncMutex::new(None),
            items_scope: AsyncMutex::new(None),
        }
    }

    /// Subscribe to list changes for a household, replacing any previous
    /// household scope. Also schedules the initial lists fetch.
    pub async fn watch_household(&self, household_id: &str) -> Result<()> {
        let mut slot = self.lists_scope.lock().await;
        if let Some(previous) = slot.take() {
            self.store.invalidate_lists(&previous.key);
            previous.teardown();
        }

        let state = Arc::new(Mutex::new(SubscriptionState::Subscribing));
        let subscription = self.feed.subscribe_lists(household_id).await?;

        let refetch_gate = Arc::new(AtomicU8::new(REFETCH_IDLE));
        schedule_lists_refetch(&self.store, &self.backend, household_id, &refetch_gate);

        let store = self.store.clone();
        let backend = self.backend.clone();
        let key = household_id.to_string();
        let task_state = state.clone();
        let task = tokio::spawn(async move {
            let mut events = subscription.events;
            while let Some(event) = events.recv().await {
                store.update_lists(&key, |current| merge_list_event(current, &event));
                schedule_lists_refetch(&store, &backend, &key, &refetch_gate);
            }
            debug!("Lists feed for household {key} ended");
            *task_state.lock().unwrap_or_else(|e| e.into_inner()) =
                SubscriptionState::Unsubscribed;
        });

        *state.lock().unwrap_or_else(|e| e.into_inner()) = SubscriptionState::Subscribed;
        *slot = Some(ScopeTask {
            key: household_id.to_string(),
            state,
            task,
        });
        Ok(())
    }

    /// Switch the active list. Tears down the previous list scope before the
    /// new one opens; two list subscriptions are never live at once.
    pub async fn set_active_list(&self, list_id: Option<&str>) -> Result<()> {
        let mut slot = self.items_scope.lock().await;
        if let Some(previous) = slot.take() {
            self.store.invalidate_items(&previous.key);
            previous.teardown();
        }
        let Some(list_id) = list_id else {
            return Ok(());
        };

        let state = Arc::new(Mutex::new(SubscriptionState::Subscribing));
        let subscription = self.feed.subscribe_items(list_id).await?;

        let refetch_gate = Arc::new(AtomicU8::new(REFETCH_IDLE));
        schedule_items_refetch(&self.store, &self.backend, list_id, &refetch_gate);

        let store = self.store.clone();
        let backend = self.backend.clone();
        let key = list_id.to_string();
        let task_state = state.clone();
        let task = tokio::spawn(async move {
            let mut events = subscription.events;
            while let Some(event) = events.recv().await {
                let now_ms = Utc::now().timestamp_millis();
                store.update_items(&key, |current| merge_item_event(current, &event, now_ms));
                schedule_items_refetch(&store, &backend, &key, &refetch_gate);
            }
            debug!("Items feed for list {key} ended");
            *task_state.lock().unwrap_or_else(|e| e.into_inner()) =
                SubscriptionState::Unsubscribed;
        });

        *state.lock().unwrap_or_else(|e| e.into_inner()) = SubscriptionState::Subscribed;
        *slot = Some(ScopeTask {
            key: list_id.to_string(),
            state,
            task,
        });
        Ok(())
    }

    /// Tear down both scopes.
    pub async fn unsubscribe_all(&self) {
        if let Some(previous) = self.lists_scope.lock().await.take() {
            self.store.invalidate_lists(&previous.key);
            previous.teardown();
        }
        if let Some(previous) = self.items_scope.lock().await.take() {
            self.store.invalidate_items(&previous.key);
            previous.teardown();
        }
    }

    pub async fn lists_state(&self) -> SubscriptionState {
        scope_state(&self.lists_scope).await
    }

    pub async fn items_state(&self) -> SubscriptionState {
        scope_state(&self.items_scope).await
    }
}

async fn scope_state(slot: &AsyncMutex<Option<ScopeTask>>) -> SubscriptionState {
    match slot.lock().await.as_ref() {
        Some(scope) => *scope.state.lock().unwrap_or_else(|e| e.into_inner()),
        None => SubscriptionState::Unsubscribed,
    }
}

/// Claim the gate for a new worker, or mark a rerun on the running one.
/// Returns true when the caller must spawn the worker.
fn claim_refetch_gate(gate: &AtomicU8) -> bool {
    loop {
        match gate.compare_exchange(
            REFETCH_IDLE,
            REFETCH_RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return true,
            Err(REFETCH_RERUN) => return false,
            Err(_) => {
                if gate
                    .compare_exchange(
                        REFETCH_RUNNING,
                        REFETCH_RERUN,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    return false;
                }
                // The worker retired between the two exchanges; try again.
            }
        }
    }
}

/// Release the gate after a fetch. Returns true when a rerun was requested
/// while the fetch was in flight and the worker must go once more.
fn release_refetch_gate(gate: &AtomicU8) -> bool {
    if gate
        .compare_exchange(
            REFETCH_RUNNING,
            REFETCH_IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_ok()
    {
        return false;
    }
    gate.store(REFETCH_RUNNING, Ordering::Release);
    true
}

fn schedule_lists_refetch(
    store: &CacheStore,
    backend: &Arc<dyn ShoppingBackend>,
    household_id: &str,
    gate: &Arc<AtomicU8>,
) {
    if !claim_refetch_gate(gate) {
        return;
    }
    let store = store.clone();
    let backend = backend.clone();
    let household_id = household_id.to_string();
    let gate = gate.clone();
    tokio::spawn(async move {
        loop {
            let generation = store.begin_lists_fetch(&household_id);
            match backend.fetch_lists(&household_id).await {
                Ok(rows) => {
                    let _ = store.complete_lists_fetch(&household_id, generation, rows);
                }
                Err(err) => {
                    warn!(
                        "Supplementary lists re-fetch failed for household {household_id}: {err}"
                    );
                }
            }
            if !release_refetch_gate(&gate) {
                break;
            }
        }
    });
}

fn schedule_items_refetch(
    store: &CacheStore,
    backend: &Arc<dyn ShoppingBackend>,
    list_id: &str,
    gate: &Arc<AtomicU8>,
) {
    if !claim_refetch_gate(gate) {
        return;
    }
    let store = store.clone();
    let backend = backend.clone();
    let list_id = list_id.to_string();
    let gate = gate.clone();
    tokio::spawn(async move {
        loop {
            let generation = store.begin_items_fetch(&list_id);
            match backend.fetch_items(&list_id).await {
                Ok(rows) => {
                    let _ = store.complete_items_fetch(&list_id, generation, rows);
                }
                Err(err) => {
                    warn!("Supplementary items re-fetch failed for list {list_id}: {err}");
                }
            }
            if !release_refetch_gate(&gate) {
                break;
            }
        }
    });
}
