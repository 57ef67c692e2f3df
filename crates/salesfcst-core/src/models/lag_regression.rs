//! Lag-feature regression forecast via the recursive rollout.

use crate::error::{ForecastError, Result};
use crate::features::{build_features, training_rows, FeatureSchema, N_LAGS};
use crate::forecast::{run_with_policy, ForecastRun, Forecaster};
use crate::regression::LinearModel;
use crate::rollout::{recursive_forecast, Rollout, RowModel};
use crate::series::DailySeries;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Single-step regression over calendar and lag features, persisted
/// together with its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagRegressionModel {
    pub schema: FeatureSchema,
    pub model: LinearModel,
}

impl LagRegressionModel {
    pub fn fit(series: &DailySeries) -> Result<Self> {
        let rows = training_rows(&build_features(series));
        if rows.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: N_LAGS + 1,
                got: series.len(),
            });
        }
        let schema = FeatureSchema::fit(&rows)?;
        let x = schema.design_matrix(&rows)?;
        let y: Vec<f64> = rows.iter().map(|r| r.target).collect();
        let model = LinearModel::fit(&x, &y)?;
        debug!(features = ?schema.names(), rows = rows.len(), "Fitted lag regression");
        Ok(Self { schema, model })
    }

    /// Roll the model forward `horizon` days past the end of `series`.
    pub fn rollout(&self, series: &DailySeries, horizon: usize) -> Result<Rollout> {
        let history = build_features(series);
        recursive_forecast(&history, &self.schema, self, horizon)
    }
}

impl RowModel for LagRegressionModel {
    fn predict_row(&self, features: &[f64]) -> Result<f64> {
        self.model.predict(features)
    }
}

/// LagRegression adapter. Retrains on the current daily series every call.
#[derive(Debug, Clone)]
pub struct LagRegressionForecaster {
    series: Arc<DailySeries>,
}

impl LagRegressionForecaster {
    pub fn new(series: Arc<DailySeries>) -> Self {
        Self { series }
    }
}

impl Forecaster for LagRegressionForecaster {
    fn name(&self) -> &str {
        "LagRegression"
    }

    fn forecast(&self, horizon: usize, include_ground_truth: bool) -> Result<ForecastRun> {
        run_with_policy(&self.series, horizon, include_ground_truth, |_| {
            let model = LagRegressionModel::fit(&self.series)?;
            Ok(model.rollout(&self.series, horizon)?.raw)
        })
    }
}
