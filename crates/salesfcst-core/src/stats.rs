//! Sales summaries and breakdowns.
//!
//! KPIs shown on the overview screen and the grouped totals behind the
//! category, region, season and promotion views.

use crate::error::{ForecastError, Result};
use crate::records::{SalesDataset, SalesRecord};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::{BTreeMap, HashMap};

/// Meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// Mar–May Spring, Jun–Aug Summer, Sep–Nov Fall, otherwise Winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }

    /// Parse a `Seasonality` label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "winter" => Some(Season::Winter),
            "spring" => Some(Season::Spring),
            "summer" => Some(Season::Summer),
            "fall" | "autumn" => Some(Season::Fall),
            _ => None,
        }
    }

    /// Season of the calendar month before `date`. Mid-season dates map to
    /// their own season: April gives Spring, not Winter.
    pub fn of_previous_month(date: NaiveDate) -> Self {
        match date.month() {
            1 => Season::Winter,
            m => Self::from_month(m - 1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Median; NaN for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    Data::new(values.to_vec()).median()
}

/// Headline figures for the loaded (or filtered) dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_units_sold: f64,
    pub avg_daily_demand: f64,
    pub median_daily_demand: f64,
    pub avg_product_sales: f64,
    pub median_product_sales: f64,
    pub unique_products: usize,
}

impl SalesSummary {
    pub fn compute(dataset: &SalesDataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(ForecastError::EmptyDataset(
                "no records in the selected range".into(),
            ));
        }
        let daily = dataset.daily_demand()?;
        let product_sales: Vec<f64> = units_sold_by_product(dataset)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        let range = dataset.date_range();

        Ok(Self {
            records: dataset.len(),
            first_date: range.map(|r| r.0),
            last_date: range.map(|r| r.1),
            total_units_sold: dataset.records().iter().map(|r| r.units_sold).sum(),
            avg_daily_demand: mean(daily.values()),
            median_daily_demand: median(daily.values()),
            avg_product_sales: mean(&product_sales),
            median_product_sales: median(&product_sales),
            unique_products: product_sales.len(),
        })
    }
}

/// Sum values per key, sorted descending by total with ties broken by key.
pub fn ranked_totals<'a>(items: impl IntoIterator<Item = (&'a str, f64)>) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for (k, v) in items {
        *totals.entry(k).or_insert(0.0) += v;
    }
    let mut out: Vec<(String, f64)> = totals.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn grouped_sum<'a>(
    dataset: &'a SalesDataset,
    key: impl Fn(&'a SalesRecord) -> Option<&'a str>,
    value: impl Fn(&SalesRecord) -> f64,
) -> Vec<(String, f64)> {
    ranked_totals(
        dataset
            .records()
            .iter()
            .filter_map(|r| key(r).map(|k| (k, value(r)))),
    )
}

/// Total units sold per product, descending.
pub fn units_sold_by_product(dataset: &SalesDataset) -> Vec<(String, f64)> {
    grouped_sum(dataset, |r| r.product_id.as_deref(), |r| r.units_sold)
}

/// Total units sold per category, descending.
pub fn units_sold_by_category(dataset: &SalesDataset) -> Vec<(String, f64)> {
    grouped_sum(dataset, |r| r.category.as_deref(), |r| r.units_sold)
}

/// Total units sold per region, descending.
pub fn units_sold_by_region(dataset: &SalesDataset) -> Vec<(String, f64)> {
    grouped_sum(dataset, |r| r.region.as_deref(), |r| r.units_sold)
}

/// Average units ordered per record, by the season of its date.
pub fn seasonal_demand(dataset: &SalesDataset) -> Vec<(Season, f64)> {
    let mut groups: BTreeMap<Season, Vec<f64>> = BTreeMap::new();
    for (date, record) in dataset.dated() {
        groups
            .entry(Season::from_date(date))
            .or_default()
            .push(record.units_ordered);
    }
    groups.into_iter().map(|(s, v)| (s, mean(&v))).collect()
}

/// Average daily demand on promotion days versus regular days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PromotionImpact {
    pub promotion_days: usize,
    pub regular_days: usize,
    pub promotion_avg: f64,
    pub regular_avg: f64,
}

impl PromotionImpact {
    /// Relative uplift of promotion days over regular days.
    pub fn uplift(&self) -> Option<f64> {
        (self.regular_avg > 0.0 && self.promotion_days > 0)
            .then(|| self.promotion_avg / self.regular_avg - 1.0)
    }
}

/// A day counts as a promotion day when any of its records is flagged.
pub fn promotion_impact(dataset: &SalesDataset) -> PromotionImpact {
    let mut days: BTreeMap<NaiveDate, (f64, bool)> = BTreeMap::new();
    for (date, record) in dataset.dated() {
        let entry = days.entry(date).or_insert((0.0, false));
        entry.0 += record.units_ordered;
        entry.1 |= record.is_promotion();
    }
    let (promo, regular): (Vec<_>, Vec<_>) = days.values().partition(|(_, p)| *p);
    let promo: Vec<f64> = promo.into_iter().map(|(v, _)| v).collect();
    let regular: Vec<f64> = regular.into_iter().map(|(v, _)| v).collect();
    PromotionImpact {
        promotion_days: promo.len(),
        regular_days: regular.len(),
        promotion_avg: mean(&promo),
        regular_avg: mean(&regular),
    }
}
