//! Plain-text rendering of command results.

use salesfcst_core::stats::PromotionImpact;
use salesfcst_core::{
    ArtifactStatus, ComparisonTable, ForecastSeries, SalesSummary, Season, SwotReport,
    SwotSection, TrainReport,
};
use std::fmt::Write;

fn fmt_num(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}", v)
    } else {
        "-".to_string()
    }
}

pub fn summary(
    s: &SalesSummary,
    categories: &[(String, f64)],
    regions: &[(String, f64)],
    seasons: &[(Season, f64)],
    promotion: &PromotionImpact,
) -> String {
    let mut out = String::new();
    let span = match (s.first_date, s.last_date) {
        (Some(a), Some(b)) => format!("{} .. {}", a, b),
        _ => "-".to_string(),
    };
    let _ = writeln!(out, "Records:               {}", s.records);
    let _ = writeln!(out, "Date span:             {}", span);
    let _ = writeln!(out, "Total units sold:      {}", fmt_num(s.total_units_sold));
    let _ = writeln!(out, "Avg daily demand:      {}", fmt_num(s.avg_daily_demand));
    let _ = writeln!(out, "Median daily demand:   {}", fmt_num(s.median_daily_demand));
    let _ = writeln!(out, "Avg product sales:     {}", fmt_num(s.avg_product_sales));
    let _ = writeln!(out, "Median product sales:  {}", fmt_num(s.median_product_sales));
    let _ = writeln!(out, "Unique products:       {}", s.unique_products);

    for (title, rows) in [("Units sold by category", categories), ("Units sold by region", regions)] {
        if rows.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}", title);
        for (name, v) in rows {
            let _ = writeln!(out, "  {:<20} {:>12}", name, fmt_num(*v));
        }
    }

    if !seasons.is_empty() {
        let _ = writeln!(out, "\nAverage units ordered by season");
        for (season, v) in seasons {
            let _ = writeln!(out, "  {:<20} {:>12}", season.name(), fmt_num(*v));
        }
    }

    let _ = writeln!(out, "\nPromotion impact (avg daily demand)");
    let _ = writeln!(
        out,
        "  {:<20} {:>12}  ({} days)",
        "Promotion",
        fmt_num(promotion.promotion_avg),
        promotion.promotion_days
    );
    let _ = writeln!(
        out,
        "  {:<20} {:>12}  ({} days)",
        "Regular",
        fmt_num(promotion.regular_avg),
        promotion.regular_days
    );
    if let Some(uplift) = promotion.uplift() {
        let _ = writeln!(out, "  {:<20} {:>11.1}%", "Uplift", uplift * 100.0);
    }
    out
}

pub fn forecast(model: &str, series: &ForecastSeries) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} forecast ({} days)", model, series.len());
    let _ = writeln!(out, "{:<12} {:>16}", "Date", "Predicted Demand");
    for p in series.points() {
        let _ = writeln!(out, "{:<12} {:>16}", p.date.to_string(), fmt_num(p.value));
    }
    out
}

pub fn comparison(table: &ComparisonTable, horizon: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model comparison over the last {} days", horizon);
    let _ = writeln!(out, "{:<16} {:>12} {:>12}", "Model", "MAE", "RMSE");
    for row in &table.rows {
        match (&row.metrics, &row.error) {
            (Some(m), _) => {
                let _ = writeln!(
                    out,
                    "{:<16} {:>12} {:>12}",
                    row.model,
                    fmt_num(m.mae),
                    fmt_num(m.rmse)
                );
            }
            (None, error) => {
                let _ = writeln!(
                    out,
                    "{:<16} error: {}",
                    row.model,
                    error.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    if let Some(best) = table.best() {
        let _ = writeln!(out, "\nBest model: {}", best.model);
    }
    out
}

pub fn training(reports: &[TrainReport]) -> String {
    let mut out = String::new();
    for r in reports {
        match (&r.path, &r.error) {
            (Some(path), None) => {
                let _ = writeln!(out, "{:<16} saved to {}", r.model, path.display());
            }
            (_, error) => {
                let _ = writeln!(
                    out,
                    "{:<16} failed: {}",
                    r.model,
                    error.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    out
}

pub fn status(entries: &[ArtifactStatus]) -> String {
    let mut out = String::new();
    for s in entries {
        let state = match (s.present, s.modified) {
            (true, Some(t)) => format!("trained {}", t.format("%Y-%m-%d %H:%M:%S UTC")),
            (true, None) => "trained".to_string(),
            (false, _) => "not trained".to_string(),
        };
        let _ = writeln!(out, "{:<16} {:<32} {}", s.model, state, s.path.display());
    }
    out
}

pub fn swot(report: &SwotReport) -> String {
    let mut out = String::new();
    for section in SwotSection::ALL {
        let _ = writeln!(out, "{}", section.name());
        for message in report.section(section) {
            let _ = writeln!(out, "  - {}", message);
        }
    }
    out
}

pub fn recommendations(messages: &[String]) -> String {
    let mut out = String::new();
    for (i, m) in messages.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, m);
    }
    out
}
