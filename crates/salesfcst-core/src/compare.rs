//! Side-by-side accuracy comparison of forecasting models.

use crate::error::Result;
use crate::forecast::Forecaster;
use crate::metrics::{evaluate, ErrorSummary};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// One model's outcome: its error metrics, or why it could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub model: String,
    pub metrics: Option<ErrorSummary>,
    pub error: Option<String>,
}

impl ComparisonRow {
    fn from_outcome(model: &str, outcome: Result<ErrorSummary>) -> Self {
        match outcome {
            Ok(metrics) => Self {
                model: model.to_string(),
                metrics: Some(metrics),
                error: None,
            },
            Err(e) => {
                warn!(model, error = %e, "Model failed during comparison");
                Self {
                    model: model.to_string(),
                    metrics: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Scored models ranked by MAE, then failed models in their given order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Rank rows given in configured order.
    pub fn ranked(rows: Vec<ComparisonRow>) -> Self {
        let (mut scored, failed): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|r| r.metrics.is_some());
        // sort_by is stable, so equal MAEs keep configured order.
        scored.sort_by(|a, b| {
            let mae = |r: &ComparisonRow| r.metrics.map_or(f64::INFINITY, |m| m.mae);
            mae(a).total_cmp(&mae(b))
        });
        scored.extend(failed);
        Self { rows: scored }
    }

    /// The lowest-MAE model, if any succeeded.
    pub fn best(&self) -> Option<&ComparisonRow> {
        self.rows.first().filter(|r| r.metrics.is_some())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn score(forecaster: &dyn Forecaster, horizon: usize) -> Result<ErrorSummary> {
    let run = forecaster.forecast(horizon, true)?;
    let actual = run.ground_truth.unwrap_or_default();
    let summary = evaluate(&actual, &run.forecast.values())?;
    debug!(model = forecaster.name(), mae = summary.mae, rmse = summary.rmse, "Scored model");
    Ok(summary)
}

/// Backtest each forecaster on its last `horizon` known days.
pub fn compare(forecasters: &[Box<dyn Forecaster>], horizon: usize) -> ComparisonTable {
    let rows = forecasters
        .iter()
        .map(|f| ComparisonRow::from_outcome(f.name(), score(f.as_ref(), horizon)))
        .collect();
    ComparisonTable::ranked(rows)
}

/// Same as [`compare`], with the forecasters spread over the rayon pool.
pub fn compare_parallel(forecasters: &[Box<dyn Forecaster>], horizon: usize) -> ComparisonTable {
    // collect on an indexed iterator keeps configured order
    let rows: Vec<ComparisonRow> = forecasters
        .par_iter()
        .map(|f| ComparisonRow::from_outcome(f.name(), score(f.as_ref(), horizon)))
        .collect();
    ComparisonTable::ranked(rows)
}
