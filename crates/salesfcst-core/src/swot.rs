//! Rule-based SWOT analysis over a sales dataset.
//!
//! [`SwotStats`] gathers every aggregate in one pass over the data. The
//! rules are plain functions from those stats to messages, listed in a
//! static table together with the section they fill.

use crate::records::{
    SalesDataset, DEMAND_FORECAST, HOLIDAY_PROMOTION, INVENTORY_LEVEL, SEASONALITY,
};
use crate::stats::{mean, median, units_sold_by_category};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows at the end of the data checked for a forecast drop.
const RECENT_ROWS: usize = 10;
/// Days on either side of the last promotion.
const PROMO_WINDOW_DAYS: u64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SwotSection {
    Strengths,
    Weaknesses,
    Opportunities,
    Threats,
}

impl SwotSection {
    pub const ALL: [SwotSection; 4] = [
        SwotSection::Strengths,
        SwotSection::Weaknesses,
        SwotSection::Opportunities,
        SwotSection::Threats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SwotSection::Strengths => "Strengths",
            SwotSection::Weaknesses => "Weaknesses",
            SwotSection::Opportunities => "Opportunities",
            SwotSection::Threats => "Threats",
        }
    }

    fn empty_message(&self) -> String {
        format!(
            "No specific {} were identified in the data.",
            self.name().to_lowercase()
        )
    }
}

/// Per-product totals and the values of its most recent record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductFacts {
    pub units_sold: f64,
    pub units_ordered: f64,
    pub latest_inventory: f64,
    pub latest_units_sold: f64,
    /// Some record forecasts below the median units ordered
    pub low_forecast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionWindow {
    pub last_promotion: NaiveDate,
    /// Units sold in the days after the last promotion
    pub units_after: f64,
    /// Mean units sold per record in the days before; None if no records
    pub avg_before: Option<f64>,
}

/// Aggregates the SWOT rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwotStats {
    pub mean_units_ordered: f64,
    pub median_units_ordered: f64,
    pub top_category_sales: Option<f64>,
    pub avg_category_sales: f64,
    /// Keyed and ordered by product id
    pub products: BTreeMap<String, ProductFacts>,
    pub median_product_sales: f64,
    pub median_product_demand: f64,
    /// Present when the data has an inventory column
    pub median_stock: Option<f64>,
    /// Units sold per `Seasonality` label, empty without that column
    pub seasonal_sales: BTreeMap<String, f64>,
    /// Demand forecasts of the last rows and the mean units ordered over them
    pub recent_forecast: Option<(Vec<f64>, f64)>,
    pub promotion: Option<PromotionWindow>,
    pub has_demand_forecast: bool,
}

impl SwotStats {
    pub fn compute(dataset: &SalesDataset) -> Self {
        let records = dataset.records();
        let ordered: Vec<f64> = records.iter().map(|r| r.units_ordered).collect();
        let median_units_ordered = median(&ordered);
        let has_inventory = dataset.has_column(INVENTORY_LEVEL);
        let has_demand_forecast = dataset.has_column(DEMAND_FORECAST);

        let category_totals: Vec<f64> = units_sold_by_category(dataset)
            .into_iter()
            .map(|(_, v)| v)
            .collect();

        let mut products: BTreeMap<String, ProductFacts> = BTreeMap::new();
        for r in records {
            let Some(id) = r.product_id.as_deref() else {
                continue;
            };
            let facts = products.entry(id.to_string()).or_default();
            facts.units_sold += r.units_sold;
            facts.units_ordered += r.units_ordered;
            facts.latest_inventory = r.inventory_level;
            facts.latest_units_sold = r.units_sold;
            facts.low_forecast |= has_demand_forecast && r.demand_forecast < median_units_ordered;
        }
        let product_sales: Vec<f64> = products.values().map(|p| p.units_sold).collect();
        let product_demand: Vec<f64> = products.values().map(|p| p.units_ordered).collect();

        let median_stock = has_inventory.then(|| {
            let stock: Vec<f64> = records.iter().map(|r| r.inventory_level).collect();
            median(&stock)
        });

        let mut seasonal_sales: BTreeMap<String, f64> = BTreeMap::new();
        if dataset.has_column(SEASONALITY) {
            for r in records {
                if let Some(label) = r.seasonality.as_deref() {
                    *seasonal_sales.entry(label.to_string()).or_insert(0.0) += r.units_sold;
                }
            }
        }

        let recent_forecast = has_demand_forecast.then(|| {
            let tail = &records[records.len().saturating_sub(RECENT_ROWS)..];
            let forecasts: Vec<f64> = tail.iter().map(|r| r.demand_forecast).collect();
            let tail_ordered: Vec<f64> = tail.iter().map(|r| r.units_ordered).collect();
            (forecasts, mean(&tail_ordered))
        });

        let promotion = if dataset.has_column(HOLIDAY_PROMOTION) {
            promotion_window(dataset)
        } else {
            None
        };

        Self {
            mean_units_ordered: mean(&ordered),
            median_units_ordered,
            top_category_sales: category_totals.first().copied(),
            avg_category_sales: mean(&category_totals),
            products,
            median_product_sales: median(&product_sales),
            median_product_demand: median(&product_demand),
            median_stock,
            seasonal_sales,
            recent_forecast,
            promotion,
            has_demand_forecast,
        }
    }

    fn product_ids_where(&self, pred: impl Fn(&ProductFacts) -> bool) -> Vec<&str> {
        self.products
            .iter()
            .filter(|(_, p)| pred(p))
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

fn promotion_window(dataset: &SalesDataset) -> Option<PromotionWindow> {
    let last_promotion = dataset
        .dated()
        .filter(|(_, r)| r.is_promotion())
        .map(|(d, _)| d)
        .max()?;
    let window = Days::new(PROMO_WINDOW_DAYS);
    let window_end = last_promotion.checked_add_days(window).unwrap_or(NaiveDate::MAX);
    let window_start = last_promotion.checked_sub_days(window).unwrap_or(NaiveDate::MIN);
    let units_after = dataset
        .dated()
        .filter(|(d, _)| *d > last_promotion && *d <= window_end)
        .map(|(_, r)| r.units_sold)
        .sum();
    let before: Vec<f64> = dataset
        .dated()
        .filter(|(d, _)| *d >= window_start && *d < last_promotion)
        .map(|(_, r)| r.units_sold)
        .collect();
    Some(PromotionWindow {
        last_promotion,
        units_after,
        avg_before: (!before.is_empty()).then(|| mean(&before)),
    })
}

struct SwotRule {
    section: SwotSection,
    evaluate: fn(&SwotStats) -> Vec<String>,
}

fn when(cond: bool, message: &str) -> Vec<String> {
    if cond {
        vec![message.to_string()]
    } else {
        Vec::new()
    }
}

fn high_average_demand(s: &SwotStats) -> Vec<String> {
    when(
        s.mean_units_ordered > s.median_units_ordered * 1.25,
        "The average daily demand is significantly high compared to historical data, indicating strong market fit.",
    )
}

fn dominant_category(s: &SwotStats) -> Vec<String> {
    when(
        s.top_category_sales
            .is_some_and(|top| top > s.avg_category_sales * 1.5),
        "A particular product category has consistently outperformed others, a sign of its popularity.",
    )
}

fn stocked_high_demand(s: &SwotStats) -> Vec<String> {
    if s.median_stock.is_none() {
        return Vec::new();
    }
    let threshold = s.median_product_demand * 1.5;
    s.product_ids_where(|p| p.units_ordered > threshold && p.latest_inventory > p.units_ordered)
        .into_iter()
        .map(|id| {
            format!(
                "Inventory for high-demand product '{}' is sufficient, ensuring no lost sales.",
                id
            )
        })
        .collect()
}

fn low_sellers(s: &SwotStats) -> Vec<String> {
    let ids = s.product_ids_where(|p| p.units_sold < s.median_product_sales * 0.5);
    if ids.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "Some products like {} are showing very low historical sales.",
        ids.join(", ")
    )]
}

fn dead_stock(s: &SwotStats) -> Vec<String> {
    let Some(median_stock) = s.median_stock else {
        return Vec::new();
    };
    let ids = s.product_ids_where(|p| {
        p.latest_inventory > median_stock * 1.5
            && p.latest_units_sold < s.median_product_sales * 0.25
    });
    if ids.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "There is significant 'dead stock' for products such as {} which are not selling well.",
        ids.join(", ")
    )]
}

fn high_potential(s: &SwotStats) -> Vec<String> {
    let ids = s.product_ids_where(|p| p.units_sold > s.median_product_sales * 0.5);
    if ids.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "Products with strong performance: {} represent an opportunity to strengthen marketing and investment.",
        ids.join(", ")
    )]
}

fn strong_seasons(s: &SwotStats) -> Vec<String> {
    let totals: Vec<f64> = s.seasonal_sales.values().copied().collect();
    let avg = mean(&totals);
    s.seasonal_sales
        .iter()
        .filter(|(_, v)| **v > avg * 0.4)
        .map(|(season, _)| {
            format!(
                "Season '{}' saw above-average sales, an opportunity to intensify marketing campaigns and plan inventory.",
                season
            )
        })
        .collect()
}

fn forecast_drop(s: &SwotStats) -> Vec<String> {
    let dropping = s
        .recent_forecast
        .as_ref()
        .is_some_and(|(forecasts, avg)| forecasts.iter().any(|f| *f < avg * 0.9));
    when(
        dropping,
        "The sales forecast predicts a future drop in demand, which may require proactive strategy adjustments.",
    )
}

fn post_promotion_slump(s: &SwotStats) -> Vec<String> {
    let slump = s.promotion.as_ref().is_some_and(|p| {
        p.avg_before
            .is_some_and(|before| p.units_after < before * 10.0)
    });
    when(
        slump,
        "A significant drop in sales was observed after a recent promotion, indicating over-reliance on discounts.",
    )
}

fn excess_inventory(s: &SwotStats) -> Vec<String> {
    let Some(median_stock) = s.median_stock else {
        return Vec::new();
    };
    if !s.has_demand_forecast {
        return Vec::new();
    }
    s.products
        .iter()
        .filter(|(_, p)| p.low_forecast && p.latest_inventory > median_stock * 1.5)
        .map(|(id, p)| {
            format!(
                "Excess inventory ({} units) for product '{}' poses a risk due to forecasted low demand.",
                p.latest_inventory, id
            )
        })
        .collect()
}

static RULES: &[SwotRule] = &[
    SwotRule {
        section: SwotSection::Strengths,
        evaluate: high_average_demand,
    },
    SwotRule {
        section: SwotSection::Strengths,
        evaluate: dominant_category,
    },
    SwotRule {
        section: SwotSection::Strengths,
        evaluate: stocked_high_demand,
    },
    SwotRule {
        section: SwotSection::Weaknesses,
        evaluate: low_sellers,
    },
    SwotRule {
        section: SwotSection::Weaknesses,
        evaluate: dead_stock,
    },
    SwotRule {
        section: SwotSection::Opportunities,
        evaluate: high_potential,
    },
    SwotRule {
        section: SwotSection::Opportunities,
        evaluate: strong_seasons,
    },
    SwotRule {
        section: SwotSection::Threats,
        evaluate: forecast_drop,
    },
    SwotRule {
        section: SwotSection::Threats,
        evaluate: post_promotion_slump,
    },
    SwotRule {
        section: SwotSection::Threats,
        evaluate: excess_inventory,
    },
];

/// Messages per section. No section is ever empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwotReport {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

impl SwotReport {
    pub fn section(&self, section: SwotSection) -> &[String] {
        match section {
            SwotSection::Strengths => &self.strengths,
            SwotSection::Weaknesses => &self.weaknesses,
            SwotSection::Opportunities => &self.opportunities,
            SwotSection::Threats => &self.threats,
        }
    }

    fn section_mut(&mut self, section: SwotSection) -> &mut Vec<String> {
        match section {
            SwotSection::Strengths => &mut self.strengths,
            SwotSection::Weaknesses => &mut self.weaknesses,
            SwotSection::Opportunities => &mut self.opportunities,
            SwotSection::Threats => &mut self.threats,
        }
    }
}

/// Run the rule table against precomputed stats.
pub fn apply_rules(stats: &SwotStats) -> SwotReport {
    let mut report = SwotReport::default();
    for rule in RULES {
        report
            .section_mut(rule.section)
            .extend((rule.evaluate)(stats));
    }
    for section in SwotSection::ALL {
        let messages = report.section_mut(section);
        if messages.is_empty() {
            messages.push(section.empty_message());
        }
    }
    report
}

pub fn swot_analysis(dataset: &SalesDataset) -> SwotReport {
    apply_rules(&SwotStats::compute(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
Date,Product ID,Category,Units Sold,Units Ordered,Inventory Level,Demand Forecast,Holiday/Promotion,Seasonality
2024-01-01,P1,Toys,100,100,50,100,0,Winter
2024-01-02,P2,Toys,90,95,40,90,0,Winter
2024-01-03,P3,Food,2,5,400,1,0,Winter
2024-01-04,P4,Garden,1,2,20,3,1,Spring
2024-01-05,P1,Toys,100,300,500,100,0,Spring
2024-01-06,P2,Toys,95,90,40,95,0,Summer
";

    fn dataset() -> SalesDataset {
        SalesDataset::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_stats() {
        let s = SwotStats::compute(&dataset());
        // Units ordered: 2 5 90 95 100 300
        assert_relative_eq!(s.median_units_ordered, 92.5);
        assert_relative_eq!(s.mean_units_ordered, 592.0 / 6.0);
        assert_eq!(s.products.len(), 4);
        let p1 = &s.products["P1"];
        assert_relative_eq!(p1.units_sold, 200.0);
        assert_relative_eq!(p1.latest_inventory, 500.0);
        assert!(!p1.low_forecast);
        assert!(s.products["P3"].low_forecast);
        // Stock: 20 40 40 50 400 500
        assert_eq!(s.median_stock, Some(45.0));
        assert_eq!(s.seasonal_sales.len(), 3);
        let promo = s.promotion.unwrap();
        assert_eq!(promo.last_promotion, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_relative_eq!(promo.units_after, 195.0);
        assert_relative_eq!(promo.avg_before.unwrap(), 64.0);
    }

    #[test]
    fn test_report() {
        let report = swot_analysis(&dataset());
        // Category totals Toys 385, Food 2, Garden 1.
        assert!(report
            .strengths
            .contains(&"A particular product category has consistently outperformed others, a sign of its popularity.".to_string()));
        // Product demand: P1 400, P2 185, P3 5, P4 2; median 95. P1 and P2 are
        // high demand, but only P1 holds more stock (500) than its demand.
        assert!(report
            .strengths
            .contains(&"Inventory for high-demand product 'P1' is sufficient, ensuring no lost sales.".to_string()));
        // Product sales: P1 200, P2 185, P3 2, P4 1; median 93.5.
        assert_eq!(
            report.weaknesses[0],
            "Some products like P3, P4 are showing very low historical sales."
        );
        assert!(report.weaknesses[1].contains("P3"));
        assert!(report.opportunities[0].contains("P1, P2"));
        // Post-promotion: 195 < 640.
        assert!(report.threats.iter().any(|m| m.contains("after a recent promotion")));
        assert!(report
            .threats
            .contains(&"Excess inventory (400 units) for product 'P3' poses a risk due to forecasted low demand.".to_string()));
    }

    #[test]
    fn test_missing_columns_skip_rules() {
        let csv = "\
Date,Product ID,Units Sold,Units Ordered
2024-01-01,P1,10,10
2024-01-02,P2,10,10
";
        let report = swot_analysis(&SalesDataset::from_reader(csv.as_bytes()).unwrap());
        assert_eq!(
            report.strengths,
            vec!["No specific strengths were identified in the data.".to_string()]
        );
        assert_eq!(
            report.threats,
            vec!["No specific threats were identified in the data.".to_string()]
        );
        assert_eq!(
            report.weaknesses,
            vec!["No specific weaknesses were identified in the data.".to_string()]
        );
        // Both products sit above half the median.
        assert_eq!(report.opportunities.len(), 1);
        assert!(report.opportunities[0].contains("P1, P2"));
    }

    #[test]
    fn test_sections_never_empty() {
        let ds = dataset().filter_dates(
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        );
        let report = swot_analysis(&ds);
        for section in SwotSection::ALL {
            assert_eq!(report.section(section).len(), 1);
        }
    }
}
