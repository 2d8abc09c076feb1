//! Comparator and key utilities shared by the merge functions.

use std::collections::HashMap;

use super::model::{CachedItem, ListRow};

/// Tolerance for treating two nullable quantities as equal.
const QUANTITY_EPSILON: f64 = 0.0001;

/// Parse an RFC3339 timestamp into epoch milliseconds.
///
/// Unparsable or empty input maps to 0 so it sorts last in descending order
/// and first in ascending order, matching the feed's tolerance for partial
/// row snapshots.
pub fn parse_timestamp_millis(value: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Trimmed, lowercased text for fuzzy equality; `None` maps to empty.
pub fn normalize_comparable_text(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_lowercase()
}

/// Nullable-safe numeric near-equality. Both-null counts as equal.
pub fn quantities_equal(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() < QUANTITY_EPSILON,
        _ => false,
    }
}

/// Rows that carry a store identity.
pub trait HasId {
    fn row_id(&self) -> &str;
}

impl HasId for ListRow {
    fn row_id(&self) -> &str {
        &self.id
    }
}

impl HasId for CachedItem {
    fn row_id(&self) -> &str {
        &self.row.id
    }
}

/// De-duplicate by identity, last write per identity wins, first-occurrence
/// positions are kept.
pub fn dedupe_by_id<T: HasId>(rows: Vec<T>) -> Vec<T> {
    let mut slot_by_id: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut out: Vec<T> = Vec::with_capacity(rows.len());
    for row in rows {
        match slot_by_id.get(row.row_id()) {
            Some(&slot) => out[slot] = row,
            None => {
                slot_by_id.insert(row.row_id().to_string(), out.len());
                out.push(row);
            }
        }
    }
    out
}

/// Stable sort descending by created timestamp; ties keep relative order.
pub fn sort_lists_desc(rows: &mut [ListRow]) {
    rows.sort_by_key(|row| std::cmp::Reverse(parse_timestamp_millis(&row.created_at)));
}

/// Stable sort ascending by created timestamp; ties keep relative order.
pub fn sort_items_asc(rows: &mut [CachedItem]) {
    rows.sort_by_key(|item| parse_timestamp_millis(&item.row.created_at));
}
