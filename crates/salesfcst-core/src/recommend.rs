//! Seasonal product recommendations.
//!
//! Aggregates for a reference date are computed once into
//! [`RecommendationStats`], then every entry of a static rule table turns
//! them into zero or more messages.

use crate::records::{SalesDataset, SalesRecord, REGION, SEASONALITY};
use crate::stats::{ranked_totals, Season};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Days before the reference date that count as "recent" for regional spikes.
pub const RECENT_WINDOW_DAYS: u64 = 30;

const TOP_SEASONAL: usize = 3;

pub const NO_RECOMMENDATIONS: &str = "No specific recommendations were found based on the provided data for this season. Please check your data or try a different date.";

/// A product ranked by units sold, with the first category seen for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
    pub product: String,
    pub category: Option<String>,
    pub units_sold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalSpike {
    pub region: String,
    pub product: String,
    pub units_sold: f64,
}

/// Everything the recommendation rules look at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationStats {
    pub reference: NaiveDate,
    pub season: Season,
    pub seasonal_top: Vec<ProductSales>,
    pub regional_spike: Option<RegionalSpike>,
    pub previous_season: Season,
    pub previous_top: Option<String>,
}

/// Season a record belongs to: its `Seasonality` label when the file has
/// that column, otherwise the season of its date.
fn record_season(dataset: &SalesDataset, record: &SalesRecord) -> Option<Season> {
    if dataset.has_column(SEASONALITY) {
        record.seasonality.as_deref().and_then(Season::from_label)
    } else {
        record.date.map(Season::from_date)
    }
}

fn top_products<'a>(records: impl Iterator<Item = &'a SalesRecord> + Clone, n: usize) -> Vec<ProductSales> {
    ranked_totals(
        records
            .clone()
            .filter_map(|r| r.product_id.as_deref().map(|p| (p, r.units_sold))),
    )
    .into_iter()
    .take(n)
    .map(|(product, units_sold)| {
        let category = records
            .clone()
            .filter(|r| r.product_id.as_deref() == Some(product.as_str()))
            .find_map(|r| r.category.clone());
        ProductSales {
            product,
            category,
            units_sold,
        }
    })
    .collect()
}

impl RecommendationStats {
    pub fn compute(dataset: &SalesDataset, reference: NaiveDate) -> Self {
        let season = Season::from_date(reference);
        let previous_season = Season::of_previous_month(reference);
        let in_season = |s: Season| {
            dataset
                .records()
                .iter()
                .filter(move |r| record_season(dataset, r) == Some(s))
        };

        let seasonal_top = top_products(in_season(season), TOP_SEASONAL);
        let previous_top = top_products(in_season(previous_season), 1)
            .into_iter()
            .next()
            .map(|p| p.product);

        let regional_spike = if dataset.has_column(REGION) {
            let since = reference
                .checked_sub_days(Days::new(RECENT_WINDOW_DAYS))
                .unwrap_or(NaiveDate::MIN);
            let mut totals: HashMap<(&str, &str), f64> = HashMap::new();
            for (_, r) in dataset.dated().filter(|(d, _)| *d >= since && *d <= reference) {
                if let (Some(region), Some(product)) = (r.region.as_deref(), r.product_id.as_deref()) {
                    *totals.entry((region, product)).or_insert(0.0) += r.units_sold;
                }
            }
            // Ties go to the alphabetically first (region, product).
            totals
                .into_iter()
                .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|((region, product), units_sold)| RegionalSpike {
                    region: region.to_string(),
                    product: product.to_string(),
                    units_sold,
                })
        } else {
            None
        };

        Self {
            reference,
            season,
            seasonal_top,
            regional_spike,
            previous_season,
            previous_top,
        }
    }
}

struct RecommendationRule {
    messages: fn(&RecommendationStats) -> Vec<String>,
}

fn seasonal_best_sellers(stats: &RecommendationStats) -> Vec<String> {
    stats
        .seasonal_top
        .iter()
        .map(|p| {
            format!(
                "Product '{}' (Category: {}) historically performs well in the {} season. Consider increasing inventory or running a targeted promotion.",
                p.product,
                p.category.as_deref().unwrap_or("Unknown"),
                stats.season
            )
        })
        .collect()
}

fn regional_spike(stats: &RecommendationStats) -> Vec<String> {
    stats
        .regional_spike
        .iter()
        .map(|s| {
            format!(
                "Product '{}' is showing a significant sales spike in the '{}' region. This could be a market opportunity for other regions.",
                s.product, s.region
            )
        })
        .collect()
}

fn clearance(stats: &RecommendationStats) -> Vec<String> {
    stats
        .previous_top
        .iter()
        .map(|p| {
            format!(
                "Product '{}' was a top seller last season. Consider running a clearance sale to manage inventory before it becomes 'dead stock'.",
                p
            )
        })
        .collect()
}

static RULES: &[RecommendationRule] = &[
    RecommendationRule {
        messages: seasonal_best_sellers,
    },
    RecommendationRule {
        messages: regional_spike,
    },
    RecommendationRule {
        messages: clearance,
    },
];

/// Apply the rule table to precomputed stats.
pub fn apply_rules(stats: &RecommendationStats) -> Vec<String> {
    let out: Vec<String> = RULES.iter().flat_map(|rule| (rule.messages)(stats)).collect();
    if out.is_empty() {
        vec![NO_RECOMMENDATIONS.to_string()]
    } else {
        out
    }
}

/// Recommendations for `reference` over `dataset`.
pub fn recommendations(dataset: &SalesDataset, reference: NaiveDate) -> Vec<String> {
    apply_rules(&RecommendationStats::compute(dataset, reference))
}
