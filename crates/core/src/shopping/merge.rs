//! Merge functions folding change-feed events into the cached collections.
//!
//! The feed delivers events in arrival order, not commit order, and events
//! for a row the client inserted itself can race the insert's own success
//! callback. Both functions are pure and total: a malformed event returns
//! the input unchanged instead of failing the reconciliation loop.

use super::keys::{
    dedupe_by_id, normalize_comparable_text, parse_timestamp_millis, quantities_equal,
    sort_items_asc, sort_lists_desc,
};
use super::model::{CachedItem, ChangeEvent, ChangeKind, ItemRow, ListRow};

/// Maximum age of an optimistic row for it to be matched against an
/// authoritative INSERT. Bounds false positives from coincidentally
/// identical later inserts while covering normal round-trip latency.
pub const OPTIMISTIC_MATCH_WINDOW_MS: i64 = 20_000;

/// Fold one change-feed event into the cached array of lists.
///
/// The result is always de-duplicated by identity and sorted descending by
/// created timestamp.
pub fn merge_list_event(current: &[ListRow], event: &ChangeEvent<ListRow>) -> Vec<ListRow> {
    if event.kind == ChangeKind::Delete {
        let Some(deleted_id) = event.deleted_id() else {
            return current.to_vec();
        };
        return current
            .iter()
            .filter(|row| row.id != deleted_id)
            .cloned()
            .collect();
    }

    let Some(incoming) = event.new.as_ref() else {
        return current.to_vec();
    };
    if incoming.id.is_empty() {
        return current.to_vec();
    }

    let mut next: Vec<ListRow> = if current.iter().any(|row| row.id == incoming.id) {
        current
            .iter()
            .map(|row| {
                if row.id == incoming.id {
                    incoming.clone()
                } else {
                    row.clone()
                }
            })
            .collect()
    } else {
        let mut appended = current.to_vec();
        appended.push(incoming.clone());
        appended
    };

    next = dedupe_by_id(next);
    sort_lists_desc(&mut next);
    next
}

/// Decide whether a cached optimistic row corresponds to an incoming
/// authoritative INSERT for an identity we have not seen yet.
pub fn is_likely_optimistic_match(
    candidate: &CachedItem,
    incoming: &ItemRow,
    now_ms: i64,
) -> bool {
    if !candidate.optimistic {
        return false;
    }
    if candidate.row.shopping_list_id != incoming.shopping_list_id {
        return false;
    }
    if normalize_comparable_text(Some(&candidate.row.product_name))
        != normalize_comparable_text(Some(&incoming.product_name))
    {
        return false;
    }
    if normalize_comparable_text(candidate.row.unit.as_deref())
        != normalize_comparable_text(incoming.unit.as_deref())
    {
        return false;
    }
    if !quantities_equal(candidate.row.quantity, incoming.quantity) {
        return false;
    }

    let inserted_at = candidate
        .optimistic_inserted_at
        .unwrap_or_else(|| parse_timestamp_millis(&candidate.row.created_at));
    if inserted_at == 0 {
        return false;
    }
    let age_ms = now_ms - inserted_at;
    (0..=OPTIMISTIC_MATCH_WINDOW_MS).contains(&age_ms)
}

/// Fold one change-feed event into the cached array of items.
///
/// Cache-only fields of an existing entry survive the merge because only the
/// store-backed row is replaced. An INSERT for an unknown identity first
/// tries to resolve an optimistic placeholder in place; an UPDATE for an
/// unknown identity is appended as a defensive upsert rather than dropped.
pub fn merge_item_event(
    current: &[CachedItem],
    event: &ChangeEvent<ItemRow>,
    now_ms: i64,
) -> Vec<CachedItem> {
    if event.kind == ChangeKind::Delete {
        let Some(deleted_id) = event.deleted_id() else {
            return current.to_vec();
        };
        return current
            .iter()
            .filter(|item| item.row.id != deleted_id)
            .cloned()
            .collect();
    }

    let Some(incoming) = event.new.as_ref() else {
        return current.to_vec();
    };
    if incoming.id.is_empty() {
        return current.to_vec();
    }

    if current.iter().any(|item| item.row.id == incoming.id) {
        let merged = current
            .iter()
            .map(|item| {
                if item.row.id == incoming.id {
                    item.with_row(incoming.clone())
                } else {
                    item.clone()
                }
            })
            .collect();
        return finalize(merged);
    }

    if event.kind == ChangeKind::Insert {
        // First match wins; the short window plus multi-field equality makes
        // multiple simultaneous candidates rare.
        if let Some(slot) = current
            .iter()
            .position(|item| is_likely_optimistic_match(item, incoming, now_ms))
        {
            let mut replaced = current.to_vec();
            let resolved = replaced[slot].resolved_with(incoming.clone());
            replaced[slot] = resolved;
            return finalize(replaced);
        }
    }

    let mut appended = current.to_vec();
    appended.push(CachedItem::from(incoming.clone()));
    finalize(appended)
}

fn finalize(items: Vec<CachedItem>) -> Vec<CachedItem> {
    let mut next = dedupe_by_id(items);
    sort_items_asc(&mut next);
    next
}
