//! Realtime reconciliation for the korb shopping-list cache.
//!
//! Ties the pure merge functions from `korb-core` to the moving parts: an
//! injectable keyed cache store, backend and change-feed contracts, the
//! subscription manager that folds pushed events into the cache, and the
//! optimistic mutation layer that edits the cache ahead of the network.

pub mod backend;
pub mod duplicate;
pub mod error;
pub mod mutation;
pub mod store;
pub mod subscription;

pub use backend::{ChangeFeed, FeedSubscription, ItemChanges, NewItem, NewList, ShoppingBackend};
pub use duplicate::find_duplicate_item;
pub use error::{RealtimeError, Result};
pub use mutation::{CommitNotice, MutationKind, MutationService, PostCommitHook};
pub use store::CacheStore;
pub use subscription::{SubscriptionManager, SubscriptionState};
