//! Batch aggregation pipeline turning purchase history into an insights
//! report. Pure: operates on an in-memory snapshot, all monetary arithmetic
//! in integer cents.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use log::debug;

use super::engine_utils::{
    calculate_data_quality, default_best_days, jaccard_score, median, normalize_product_key,
    normalize_text, pick_search_keyword, WEEKDAY_LONG, WEEKDAY_SHORT,
};
use super::model::{
    ActiveOffer, CategoryInfo, CategoryTrend, DaySpending, InsightsData, InsightsMeta,
    MerchantSwitch, MonthlyPeriod, MonthlySnapshot, PriceTrend, ReceiptItem, ReceiptSummary,
    RetailerOptimization, Tip,
};

/// Offers scoring below this Jaccard threshold are rejected outright.
pub const OFFER_MATCH_SCORE_THRESHOLD: f64 = 0.34;

/// Minimum trailing-window receipts before any analysis is attempted.
pub const MIN_RECEIPTS_FOR_INSIGHTS: usize = 10;

/// How many top-spend products are considered for offer matching.
const OFFER_CANDIDATE_LIMIT: usize = 15;

struct ProductPurchase {
    product_key: String,
    merchant_id: Option<String>,
    merchant_name: String,
    unit_price_cents: i64,
    quantity: f64,
}

#[derive(Default)]
struct ProductStats {
    display_name: String,
    total_spent_cents: i64,
    total_quantity: f64,
}

#[derive(Default)]
struct UnitAggregate {
    display_name: String,
    total_cost_cents: i64,
    total_quantity: f64,
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn months_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    month_start(next_year, next_month)
        .pred_opt()
        .unwrap_or(NaiveDate::MIN)
}

fn month_label(period: MonthlyPeriod) -> String {
    month_start(period.year(), period.month())
        .format("%B %Y")
        .to_string()
}

fn format_currency(cents: i64) -> String {
    format!("{:.2} €", cents as f64 / 100.0)
}

fn effective_quantity(item: &ReceiptItem) -> f64 {
    if item.quantity > 0.0 {
        item.quantity
    } else {
        1.0
    }
}

fn default_insights(
    generated_at: &str,
    label: &str,
    receipt_count: usize,
    tip_description: String,
    best_day_description: String,
) -> InsightsData {
    InsightsData {
        savings_potential_cents: 0,
        efficiency_percentage: 0,
        is_efficiency_positive: true,
        best_days: default_best_days(),
        best_day_description,
        retailer_optimization: RetailerOptimization {
            title: "Retailer optimization".to_string(),
            description: "Once enough comparable purchases exist we will show concrete retailer recommendations.".to_string(),
            savings_amount_cents: 0,
        },
        category_trend: CategoryTrend {
            title: format!("Price trend {label}"),
            description: "No reliable price comparison against the previous month yet.".to_string(),
        },
        tips: vec![Tip {
            id: "tip-more-data".to_string(),
            title: "Collect more data".to_string(),
            description: tip_description,
        }],
        meta: InsightsMeta {
            generated_at: generated_at.to_string(),
            receipt_count,
            comparable_products: 0,
            data_quality: calculate_data_quality(receipt_count, 0),
        },
    }
}

struct WeekdayProfile {
    best_days: Vec<DaySpending>,
    description: String,
    spread_percent: i64,
}

/// Bucket the trailing-window receipts by Monday-indexed weekday and derive
/// a 0-100 intensity score per populated bucket, scaled between the min and
/// max bucket averages.
fn weekday_profile(history: &[ReceiptSummary]) -> WeekdayProfile {
    let mut totals = [0_i64; 7];
    let mut counts = [0_usize; 7];
    for receipt in history {
        let index = receipt.date.weekday().num_days_from_monday() as usize;
        totals[index] += receipt.total_amount_cents;
        counts[index] += 1;
    }

    let averages: Vec<i64> = (0..7)
        .map(|i| {
            if counts[i] > 0 {
                ((totals[i] as f64) / (counts[i] as f64)).round() as i64
            } else {
                0
            }
        })
        .collect();
    let populated: Vec<usize> = (0..7).filter(|&i| counts[i] > 0).collect();

    if populated.len() < 2 {
        return WeekdayProfile {
            best_days: default_best_days(),
            description: "Not enough data yet for reliable weekday patterns.".to_string(),
            spread_percent: 0,
        };
    }

    let min_average = populated.iter().map(|&i| averages[i]).min().unwrap_or(0);
    let max_average = populated.iter().map(|&i| averages[i]).max().unwrap_or(0);
    let best_index = populated
        .iter()
        .copied()
        .find(|&i| averages[i] == min_average)
        .unwrap_or(0);
    let worst_index = populated
        .iter()
        .copied()
        .find(|&i| averages[i] == max_average)
        .unwrap_or(0);

    let spread_percent = if min_average > 0 {
        (((max_average - min_average) as f64 / min_average as f64) * 100.0).round() as i64
    } else {
        0
    };

    let best_days = WEEKDAY_SHORT
        .iter()
        .enumerate()
        .map(|(index, &day)| {
            if !populated.contains(&index) {
                return DaySpending {
                    day: day.to_string(),
                    percentage: 10,
                    is_highlighted: false,
                };
            }
            let percentage = if max_average == min_average {
                60
            } else {
                let score = (((max_average - averages[index]) as f64
                    / (max_average - min_average) as f64)
                    * 100.0)
                    .round() as i64;
                score.max(8)
            };
            DaySpending {
                day: day.to_string(),
                percentage,
                is_highlighted: index == best_index,
            }
        })
        .collect();

    let description = format!(
        "{} is currently the cheapest day (avg {} per purchase). {} averages {}% higher.",
        WEEKDAY_LONG[best_index],
        format_currency(min_average),
        WEEKDAY_LONG[worst_index],
        spread_percent
    );

    WeekdayProfile {
        best_days,
        description,
        spread_percent,
    }
}

struct RetailerSavings {
    comparable_products: usize,
    savings_cents: i64,
    top_switch: Option<MerchantSwitch>,
}

/// For every product bought at two or more merchants, benchmark each
/// merchant by its median unit price and sum the positive gaps against the
/// cheapest benchmark, tracked per merchant pair.
fn retailer_savings(purchases: &[ProductPurchase]) -> RetailerSavings {
    let mut grouped: BTreeMap<&str, Vec<&ProductPurchase>> = BTreeMap::new();
    for purchase in purchases {
        grouped
            .entry(purchase.product_key.as_str())
            .or_default()
            .push(purchase);
    }

    let mut comparable_products = 0;
    let mut savings_cents = 0_i64;
    let mut switches: BTreeMap<String, MerchantSwitch> = BTreeMap::new();

    for product_purchases in grouped.values() {
        let mut by_merchant: BTreeMap<&str, (&str, Vec<i64>)> = BTreeMap::new();
        for purchase in product_purchases {
            let Some(merchant_id) = purchase.merchant_id.as_deref() else {
                continue;
            };
            by_merchant
                .entry(merchant_id)
                .or_insert_with(|| (purchase.merchant_name.as_str(), Vec::new()))
                .1
                .push(purchase.unit_price_cents);
        }

        if by_merchant.len() < 2 {
            continue;
        }
        comparable_products += 1;

        let mut benchmarks: Vec<(&str, &str, i64)> = by_merchant
            .iter()
            .map(|(&id, (name, prices))| (id, *name, median(prices)))
            .collect();
        benchmarks.sort_by(|a, b| a.2.cmp(&b.2).then(a.0.cmp(b.0)));
        let (best_id, best_name, best_benchmark) = benchmarks[0];

        for purchase in product_purchases {
            let Some(merchant_id) = purchase.merchant_id.as_deref() else {
                continue;
            };
            if merchant_id == best_id {
                continue;
            }
            let diff_per_unit = purchase.unit_price_cents - best_benchmark;
            if diff_per_unit <= 0 {
                continue;
            }
            let savings = ((diff_per_unit as f64) * purchase.quantity).round() as i64;
            savings_cents += savings;

            let key = format!("{merchant_id}->{best_id}");
            switches
                .entry(key)
                .and_modify(|entry| {
                    entry.savings_cents += savings;
                    entry.product_count += 1;
                })
                .or_insert_with(|| MerchantSwitch {
                    from: purchase.merchant_name.clone(),
                    to: best_name.to_string(),
                    savings_cents: savings,
                    product_count: 1,
                });
        }
    }

    let top_switch = switches
        .into_values()
        .max_by_key(|switch| switch.savings_cents);

    RetailerSavings {
        comparable_products,
        savings_cents,
        top_switch,
    }
}

struct OfferOpportunity {
    product_name: String,
    store: String,
    savings_cents: i64,
}

/// Fuzzy-match the highest-spend products against active offers and weight
/// the per-unit savings by the clamped match score.
fn offer_savings(
    stats: &BTreeMap<String, ProductStats>,
    offers: &[ActiveOffer],
) -> (i64, Option<OfferOpportunity>) {
    let mut candidates: Vec<(&String, &ProductStats)> = stats.iter().collect();
    candidates.sort_by(|a, b| b.1.total_spent_cents.cmp(&a.1.total_spent_cents).then(a.0.cmp(b.0)));
    candidates.truncate(OFFER_CANDIDATE_LIMIT);

    let mut total_cents = 0_i64;
    let mut best: Option<OfferOpportunity> = None;

    for (_, product) in candidates {
        let Some(keyword) = pick_search_keyword(&product.display_name) else {
            continue;
        };
        if product.total_quantity <= 0.0 {
            continue;
        }

        let mut scored: Vec<(&ActiveOffer, i64, f64)> = offers
            .iter()
            .filter_map(|offer| {
                let price_cents = offer.price_cents?;
                if !normalize_text(&offer.product_name).contains(&keyword) {
                    return None;
                }
                let score = jaccard_score(&product.display_name, &offer.product_name);
                if score < OFFER_MATCH_SCORE_THRESHOLD {
                    return None;
                }
                Some((offer, price_cents, score))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let Some(&(offer, offer_unit_cents, score)) = scored.first() else {
            continue;
        };

        let avg_paid_unit_cents =
            ((product.total_spent_cents as f64) / product.total_quantity).round() as i64;
        let diff_per_unit = avg_paid_unit_cents - offer_unit_cents;
        if diff_per_unit <= 0 {
            continue;
        }

        let weighted = ((diff_per_unit as f64) * product.total_quantity * score.clamp(0.4, 1.0))
            .round() as i64;
        if weighted <= 0 {
            continue;
        }
        total_cents += weighted;

        let replace = best
            .as_ref()
            .map(|current| weighted > current.savings_cents)
            .unwrap_or(true);
        if replace {
            best = Some(OfferOpportunity {
                product_name: product.display_name.clone(),
                store: offer.store.clone(),
                savings_cents: weighted,
            });
        }
    }

    (total_cents, best)
}

fn aggregate_unit_prices(items: &[&ReceiptItem]) -> BTreeMap<String, UnitAggregate> {
    let mut map: BTreeMap<String, UnitAggregate> = BTreeMap::new();
    for item in items {
        let key = normalize_product_key(&item.product_name);
        if key.is_empty() {
            continue;
        }
        let quantity = effective_quantity(item);
        let entry = map.entry(key).or_default();
        if entry.display_name.is_empty() {
            entry.display_name = item.product_name.clone();
        }
        entry.total_cost_cents += ((item.price_cents as f64) * quantity).round() as i64;
        entry.total_quantity += quantity;
    }
    map
}

/// Strongest per-unit price change of a product vs the previous month.
fn strongest_price_trend(
    selected: &[&ReceiptItem],
    previous: &[&ReceiptItem],
) -> Option<PriceTrend> {
    let current_prices = aggregate_unit_prices(selected);
    let previous_prices = aggregate_unit_prices(previous);

    let mut strongest: Option<PriceTrend> = None;
    for (key, current) in &current_prices {
        let Some(previous) = previous_prices.get(key) else {
            continue;
        };
        if previous.total_quantity <= 0.0 || current.total_quantity <= 0.0 {
            continue;
        }

        let current_unit = ((current.total_cost_cents as f64) / current.total_quantity).round() as i64;
        let previous_unit =
            ((previous.total_cost_cents as f64) / previous.total_quantity).round() as i64;
        if previous_unit <= 0 {
            continue;
        }

        let change_percent =
            ((current_unit - previous_unit) as f64 / previous_unit as f64) * 100.0;
        if !change_percent.is_finite() {
            continue;
        }

        let stronger = strongest
            .as_ref()
            .map(|trend| change_percent.abs() > trend.change_percent.abs())
            .unwrap_or(true);
        if stronger {
            strongest = Some(PriceTrend {
                product_name: current.display_name.clone(),
                current_unit_cents: current_unit,
                previous_unit_cents: previous_unit,
                change_percent,
            });
        }
    }
    strongest
}

struct CategoryShift {
    name: String,
    current_cents: i64,
    previous_cents: i64,
    change_percent: f64,
}

fn root_category_name(
    item: &ReceiptItem,
    categories: &HashMap<&str, &CategoryInfo>,
) -> String {
    let Some(category_id) = item.category_id.as_deref() else {
        return "Other".to_string();
    };
    let Some(category) = categories.get(category_id) else {
        return "Other".to_string();
    };
    if let Some(parent_id) = category.parent_id.as_deref() {
        if let Some(parent) = categories.get(parent_id) {
            return parent.name.clone();
        }
    }
    category.name.clone()
}

fn aggregate_category_spend(
    items: &[&ReceiptItem],
    categories: &HashMap<&str, &CategoryInfo>,
) -> BTreeMap<String, i64> {
    let mut map: BTreeMap<String, i64> = BTreeMap::new();
    for item in items {
        let root = root_category_name(item, categories);
        let amount = ((item.price_cents as f64) * effective_quantity(item)).round() as i64;
        *map.entry(root).or_default() += amount;
    }
    map
}

/// Strongest root-category spend change vs the previous month; a category
/// absent last month counts as +100%.
fn strongest_category_shift(
    selected: &[&ReceiptItem],
    previous: &[&ReceiptItem],
    categories: &HashMap<&str, &CategoryInfo>,
) -> Option<CategoryShift> {
    let current_spend = aggregate_category_spend(selected, categories);
    let previous_spend = aggregate_category_spend(previous, categories);

    let mut names: Vec<&String> = current_spend.keys().chain(previous_spend.keys()).collect();
    names.sort();
    names.dedup();

    let mut strongest: Option<CategoryShift> = None;
    for name in names {
        let current_cents = current_spend.get(name).copied().unwrap_or(0);
        let previous_cents = previous_spend.get(name).copied().unwrap_or(0);
        if current_cents == 0 && previous_cents == 0 {
            continue;
        }
        let change_percent = if previous_cents > 0 {
            ((current_cents - previous_cents) as f64 / previous_cents as f64) * 100.0
        } else {
            100.0
        };

        let stronger = strongest
            .as_ref()
            .map(|shift| change_percent.abs() > shift.change_percent.abs())
            .unwrap_or(true);
        if stronger {
            strongest = Some(CategoryShift {
                name: name.clone(),
                current_cents,
                previous_cents,
                change_percent,
            });
        }
    }
    strongest
}

/// Build the full insights report for one household and month.
pub fn build_insights(
    period: MonthlyPeriod,
    snapshot: &MonthlySnapshot,
    generated_at: &str,
) -> InsightsData {
    let label = month_label(period);
    let selected_start = month_start(period.year(), period.month());
    let selected_end = month_end(period.year(), period.month());
    let (prev_year, prev_month) = months_back(period.year(), period.month(), 1);
    let previous_start = month_start(prev_year, prev_month);
    let previous_end = month_end(prev_year, prev_month);

    // Trailing six-month window: the selected month plus the five before it.
    let (history_year, history_month) = months_back(period.year(), period.month(), 5);
    let history_start = month_start(history_year, history_month);

    let history: Vec<&ReceiptSummary> = snapshot
        .receipts
        .iter()
        .filter(|receipt| receipt.date >= history_start && receipt.date <= selected_end)
        .collect();
    let selected: Vec<&ReceiptSummary> = history
        .iter()
        .copied()
        .filter(|receipt| receipt.date >= selected_start)
        .collect();
    let previous: Vec<&ReceiptSummary> = history
        .iter()
        .copied()
        .filter(|receipt| receipt.date >= previous_start && receipt.date <= previous_end)
        .collect();

    if selected.is_empty() {
        return default_insights(
            generated_at,
            &label,
            0,
            format!("No receipts captured for {label} yet."),
            format!("No purchases recorded for {label} yet."),
        );
    }

    if history.len() < MIN_RECEIPTS_FOR_INSIGHTS {
        return default_insights(
            generated_at,
            &label,
            selected.len(),
            format!(
                "Reliable insights need at least {MIN_RECEIPTS_FOR_INSIGHTS} receipts in the trailing six months (currently {}).",
                history.len()
            ),
            "Not enough data yet for reliable weekday patterns.".to_string(),
        );
    }

    debug!(
        "Building insights for {label}: {} selected, {} previous, {} history receipts",
        selected.len(),
        previous.len(),
        history.len()
    );

    let selected_ids: HashMap<&str, (&Option<String>, &Option<String>)> = selected
        .iter()
        .map(|r| (r.id.as_str(), (&r.merchant_id, &r.merchant_name)))
        .collect();
    let previous_ids: HashMap<&str, ()> = previous.iter().map(|r| (r.id.as_str(), ())).collect();

    let selected_items: Vec<&ReceiptItem> = snapshot
        .items
        .iter()
        .filter(|item| selected_ids.contains_key(item.receipt_id.as_str()))
        .collect();
    let previous_items: Vec<&ReceiptItem> = snapshot
        .items
        .iter()
        .filter(|item| previous_ids.contains_key(item.receipt_id.as_str()))
        .collect();

    let selected_total: i64 = selected.iter().map(|r| r.total_amount_cents).sum();
    let previous_total: i64 = previous.iter().map(|r| r.total_amount_cents).sum();
    let efficiency_percentage = if previous_total > 0 {
        (((previous_total - selected_total) as f64 / previous_total as f64) * 100.0).round() as i64
    } else {
        0
    };

    let history_owned: Vec<ReceiptSummary> = history.iter().map(|&r| r.clone()).collect();
    let weekdays = weekday_profile(&history_owned);

    // Selected-month purchase records for merchant comparison and offers.
    let mut purchases: Vec<ProductPurchase> = Vec::new();
    let mut stats: BTreeMap<String, ProductStats> = BTreeMap::new();
    for item in &selected_items {
        let key = normalize_product_key(&item.product_name);
        if key.is_empty() {
            continue;
        }
        let quantity = effective_quantity(item);
        let (merchant_id, merchant_name) = selected_ids
            .get(item.receipt_id.as_str())
            .map(|(id, name)| ((*id).clone(), (*name).clone()))
            .unwrap_or((None, None));

        purchases.push(ProductPurchase {
            product_key: key.clone(),
            merchant_id,
            merchant_name: merchant_name.unwrap_or_else(|| "Unknown".to_string()),
            unit_price_cents: item.price_cents,
            quantity,
        });

        let entry = stats.entry(key).or_default();
        if entry.display_name.is_empty() {
            entry.display_name = item.product_name.clone();
        }
        entry.total_spent_cents += ((item.price_cents as f64) * quantity).round() as i64;
        entry.total_quantity += quantity;
    }

    let retailer = retailer_savings(&purchases);
    let retailer_optimization = if retailer.comparable_products == 0 {
        RetailerOptimization {
            title: "Retailer optimization".to_string(),
            description:
                "Too few products were bought at more than one retailer this month.".to_string(),
            savings_amount_cents: 0,
        }
    } else if retailer.savings_cents > 0 && retailer.top_switch.is_some() {
        let top = retailer.top_switch.as_ref().map(|s| (s.to.clone(), s.from.clone()));
        let (to, from) = top.unwrap_or_default();
        RetailerOptimization {
            title: "Retailer optimization".to_string(),
            description: format!(
                "Across {} comparable products, {to} was often cheaper than {from}. Potential in {label}: {}.",
                retailer.comparable_products,
                format_currency(retailer.savings_cents)
            ),
            savings_amount_cents: retailer.savings_cents,
        }
    } else {
        RetailerOptimization {
            title: "Retailer optimization".to_string(),
            description: "Your retailer prices are already close together this month.".to_string(),
            savings_amount_cents: 0,
        }
    };

    let (offer_cents, best_offer) = offer_savings(&stats, &snapshot.offers);

    let price_trend = strongest_price_trend(&selected_items, &previous_items);
    let category_map: HashMap<&str, &CategoryInfo> = snapshot
        .categories
        .iter()
        .map(|c| (c.id.as_str(), c))
        .collect();
    let category_shift =
        strongest_category_shift(&selected_items, &previous_items, &category_map);

    let category_trend = if let Some(trend) = price_trend
        .as_ref()
        .filter(|trend| trend.change_percent.abs() >= 5.0)
    {
        let direction = if trend.change_percent >= 0.0 {
            "more expensive"
        } else {
            "cheaper"
        };
        CategoryTrend {
            title: format!("Price trend: {}", trend.product_name),
            description: format!(
                "{} is {:.0}% {direction} than last month ({} -> {} per unit).",
                trend.product_name,
                trend.change_percent.abs(),
                format_currency(trend.previous_unit_cents),
                format_currency(trend.current_unit_cents)
            ),
        }
    } else if let Some(shift) = &category_shift {
        let direction = if shift.change_percent >= 0.0 {
            "up"
        } else {
            "down"
        };
        CategoryTrend {
            title: format!("Category trend: {}", shift.name),
            description: format!(
                "{} is {direction} {:.0}% ({} -> {}).",
                shift.name,
                shift.change_percent.abs(),
                format_currency(shift.previous_cents),
                format_currency(shift.current_cents)
            ),
        }
    } else {
        CategoryTrend {
            title: format!("Price trend {label}"),
            description: "No reliable trend against the previous month yet.".to_string(),
        }
    };

    let savings_potential_cents = (retailer.savings_cents + offer_cents).max(0);

    let mut tips: Vec<Tip> = Vec::new();
    if savings_potential_cents >= 500 {
        tips.push(Tip {
            id: "tip-potential".to_string(),
            title: "Activate savings potential".to_string(),
            description: format!(
                "Roughly {} of realistic potential in {label}.",
                format_currency(savings_potential_cents)
            ),
        });
    }
    if retailer.savings_cents >= 300 {
        if let Some(top) = &retailer.top_switch {
            tips.push(Tip {
                id: "tip-retailer".to_string(),
                title: "Use the retailer switch".to_string(),
                description: format!(
                    "{} -> {} saves an estimated {}.",
                    top.from,
                    top.to,
                    format_currency(top.savings_cents)
                ),
            });
        }
    }
    if offer_cents >= 200 {
        if let Some(offer) = &best_offer {
            tips.push(Tip {
                id: "tip-offers".to_string(),
                title: "Buy offers deliberately".to_string(),
                description: format!(
                    "{} is currently much cheaper at {}.",
                    offer.product_name, offer.store
                ),
            });
        }
    }
    if weekdays.spread_percent >= 15 {
        tips.push(Tip {
            id: "tip-weekday".to_string(),
            title: "Optimize your shopping day".to_string(),
            description: format!(
                "The cheapest and most expensive weekday differ by {}% right now.",
                weekdays.spread_percent
            ),
        });
    }
    if let Some(trend) = price_trend
        .as_ref()
        .filter(|trend| trend.change_percent >= 8.0)
    {
        if tips.iter().all(|tip| tip.id != "tip-price-up") {
            tips.push(Tip {
                id: "tip-price-up".to_string(),
                title: "Watch the price increase".to_string(),
                description: format!(
                    "{} is clearly more expensive than last month.",
                    trend.product_name
                ),
            });
        }
    }
    if tips.is_empty() {
        tips.push(Tip {
            id: "tip-stable".to_string(),
            title: "Spending currently stable".to_string(),
            description: "This month shows no big outliers. Keep up the structured shopping."
                .to_string(),
        });
    }
    tips.truncate(3);

    InsightsData {
        savings_potential_cents,
        efficiency_percentage,
        is_efficiency_positive: efficiency_percentage >= 0,
        best_days: weekdays.best_days,
        best_day_description: weekdays.description,
        retailer_optimization,
        category_trend,
        tips,
        meta: InsightsMeta {
            generated_at: generated_at.to_string(),
            receipt_count: selected.len(),
            comparable_products: retailer.comparable_products,
            data_quality: calculate_data_quality(selected.len(), retailer.comparable_products),
        },
    }
}
