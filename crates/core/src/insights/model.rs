//! Input snapshot and output report types for the insights engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};

/// Reporting period. Fields are private so every instance has passed the
/// range check in [`MonthlyPeriod::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyPeriod {
    year: i32,
    month: u32,
}

impl MonthlyPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(2020..=2100).contains(&year) || !(1..=12).contains(&month) {
            return Err(CoreError::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

/// One purchase receipt, already joined with its merchant record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub id: String,
    pub date: NaiveDate,
    pub total_amount_cents: i64,
    pub merchant_id: Option<String>,
    pub merchant_name: Option<String>,
}

/// One line of a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub receipt_id: String,
    pub product_name: String,
    pub quantity: f64,
    pub price_cents: i64,
    pub category_id: Option<String>,
}

/// Category record used to resolve root categories for trend grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// A currently valid retailer offer, candidate for fuzzy matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOffer {
    pub product_name: String,
    pub store: String,
    pub price_cents: Option<i64>,
    pub valid_until: Option<NaiveDate>,
}

/// Batch input for one insights run: receipts cover a 6-month trailing
/// window ending at the selected month, items cover the selected and
/// previous month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySnapshot {
    pub receipts: Vec<ReceiptSummary>,
    pub items: Vec<ReceiptItem>,
    pub categories: Vec<CategoryInfo>,
    pub offers: Vec<ActiveOffer>,
}

/// Spend intensity for one weekday, Monday-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySpending {
    pub day: String,
    pub percentage: i64,
    pub is_highlighted: bool,
}

/// Retailer switch recommendation derived from per-product benchmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerOptimization {
    pub title: String,
    pub description: String,
    pub savings_amount_cents: i64,
}

/// Aggregated savings from moving purchases between one merchant pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantSwitch {
    pub from: String,
    pub to: String,
    pub savings_cents: i64,
    pub product_count: usize,
}

/// Strongest per-unit price move of one product vs the previous month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTrend {
    pub product_name: String,
    pub current_unit_cents: i64,
    pub previous_unit_cents: i64,
    pub change_percent: f64,
}

/// Strongest category spend move vs the previous month, or the price trend
/// fallback copy when no trend qualifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTrend {
    pub title: String,
    pub description: String,
}

/// One actionable suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Confidence classification for the generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Low,
    Medium,
    High,
}

/// Report metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsMeta {
    pub generated_at: String,
    pub receipt_count: usize,
    pub comparable_products: usize,
    pub data_quality: DataQuality,
}

/// Full insights report for one household and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsData {
    pub savings_potential_cents: i64,
    pub efficiency_percentage: i64,
    pub is_efficiency_positive: bool,
    pub best_days: Vec<DaySpending>,
    pub best_day_description: String,
    pub retailer_optimization: RetailerOptimization,
    pub category_trend: CategoryTrend,
    pub tips: Vec<Tip>,
    pub meta: InsightsMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_out_of_range_input() {
        assert!(MonthlyPeriod::new(2026, 0).is_err());
        assert!(MonthlyPeriod::new(2026, 13).is_err());
        assert!(MonthlyPeriod::new(1999, 5).is_err());
    }

    #[test]
    fn period_exposes_its_validated_parts() {
        let period = MonthlyPeriod::new(2026, 8).unwrap();
        assert_eq!(period.year(), 2026);
        assert_eq!(period.month(), 8);
    }
}
