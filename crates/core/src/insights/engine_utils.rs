//! Pure helpers for the insights engine: product-name normalization, fuzzy
//! matching and small statistics.

use std::collections::HashSet;

use super::model::{DataQuality, DaySpending};

/// Weekday labels, Monday-first, matching the profile bucket order.
pub const WEEKDAY_SHORT: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Long weekday names used in report copy.
pub const WEEKDAY_LONG: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Packaging and size words that carry no product identity.
const PRODUCT_STOPWORDS: [&str; 16] = [
    "bio", "frisch", "gross", "klein", "packung", "stuck", "stk", "g", "kg", "ml", "l", "liter",
    "beutel", "dose", "glas", "tuete",
];

fn is_stopword(token: &str) -> bool {
    PRODUCT_STOPWORDS.contains(&token)
}

/// Lowercase with common Latin diacritics folded to ASCII and ß expanded.
pub fn normalize_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.to_lowercase().chars() {
        match ch {
            'ä' | 'à' | 'á' | 'â' | 'ã' | 'å' => out.push('a'),
            'ö' | 'ò' | 'ó' | 'ô' | 'õ' => out.push('o'),
            'ü' | 'ù' | 'ú' | 'û' => out.push('u'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'ç' => out.push('c'),
            'ñ' => out.push('n'),
            'ß' => out.push_str("ss"),
            other => out.push(other),
        }
    }
    out
}

/// Split a product name into normalized alphanumeric tokens.
pub fn tokenize_product_name(value: &str) -> Vec<String> {
    normalize_text(value)
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// Grouping key for a product: up to five significant tokens, space-joined.
pub fn normalize_product_key(value: &str) -> String {
    tokenize_product_name(value)
        .into_iter()
        .filter(|token| token.len() >= 2 && !is_stopword(token))
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First token long enough to serve as an offer search keyword.
pub fn pick_search_keyword(value: &str) -> Option<String> {
    tokenize_product_name(value)
        .into_iter()
        .find(|token| token.len() >= 3 && !is_stopword(token))
}

fn to_token_set(value: &str) -> HashSet<String> {
    tokenize_product_name(value)
        .into_iter()
        .filter(|token| token.len() >= 2 && !is_stopword(token))
        .collect()
}

/// Token-set Jaccard similarity of two product names in `[0, 1]`.
pub fn jaccard_score(a: &str, b: &str) -> f64 {
    let set_a = to_token_set(a);
    let set_b = to_token_set(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.len() + set_b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Median of integer cents; even-length input rounds the middle pair's mean,
/// empty input maps to 0.
pub fn median(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        ((sorted[middle - 1] + sorted[middle]) as f64 / 2.0).round() as i64
    } else {
        sorted[middle]
    }
}

/// Neutral weekday profile used when too few days carry data.
pub fn default_best_days() -> Vec<DaySpending> {
    WEEKDAY_SHORT
        .iter()
        .map(|&day| DaySpending {
            day: day.to_string(),
            percentage: 20,
            is_highlighted: false,
        })
        .collect()
}

/// Classify report confidence from receipt volume and product coverage.
pub fn calculate_data_quality(receipt_count: usize, comparable_products: usize) -> DataQuality {
    if receipt_count >= 12 && comparable_products >= 5 {
        DataQuality::High
    } else if receipt_count >= 6 && comparable_products >= 2 {
        DataQuality::Medium
    } else {
        DataQuality::Low
    }
}
