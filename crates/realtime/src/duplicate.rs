//! Duplicate detection for the add-item confirmation flow.

use korb_core::shopping::CachedItem;

/// Find the first cached item whose product name matches `candidate`,
/// case-insensitively, either exactly or as a substring in either direction
/// ("Duplo" matches "Ferrero Duplo" and vice versa). Returns the matched
/// entry so the caller can name it in the confirmation prompt.
pub fn find_duplicate_item<'a>(
    items: &'a [CachedItem],
    candidate: &str,
) -> Option<&'a CachedItem> {
    let normalized = candidate.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    items.iter().find(|entry| {
        let existing = entry.row.product_name.trim().to_lowercase();
        existing == normalized
            || existing.contains(&normalized)
            || normalized.contains(&existing)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use korb_core::shopping::ItemRow;

    fn item(name: &str) -> CachedItem {
        CachedItem::from(ItemRow {
            id: format!("item-{name}"),
            shopping_list_id: "list-1".to_string(),
            product_id: None,
            product_name: name.to_string(),
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
    fn exact_match_ignores_case_and_whitespace() {
        let items = vec![item("Milch")];
        let found = find_duplicate_item(&items, "  milch ");
        assert_eq!(found.unwrap().row.product_name, "Milch");
    }

    #[test]
    fn substring_matches_in_both_directions() {
        let items = vec![item("Ferrero Duplo")];
        assert!(find_duplicate_item(&items, "Duplo").is_some());

        let items = vec![item("Duplo")];
        assert!(find_duplicate_item(&items, "Ferrero Duplo").is_some());
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let items = vec![item("Milch"), item("Brot")];
        assert!(find_duplicate_item(&items, "Eier").is_none());
    }

    #[test]
    fn blank_candidate_never_matches() {
        let items = vec![item("Milch")];
        assert!(find_duplicate_item(&items, "   ").is_none());
    }

    #[test]
    fn first_match_wins() {
        let items = vec![item("Vollmilch"), item("Milch")];
        let found = find_duplicate_item(&items, "milch").unwrap();
        assert_eq!(found.row.product_name, "Vollmilch");
    }
}
