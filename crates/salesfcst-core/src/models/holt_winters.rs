//! Additive Holt-Winters (ETS `AAA`) with a weekly season.

use crate::error::{ForecastError, Result};
use crate::forecast::{run_with_policy, ForecastRun, Forecaster};
use crate::series::DailySeries;
use anofox_forecast::core::TimeSeriesBuilder;
use anofox_forecast::models::exponential::{ETSSpec, ETS as ETSModel};
use anofox_forecast::prelude::Forecaster as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Smoothing settings for the additive Holt-Winters model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoltWintersSettings {
    /// Season length in days
    pub period: usize,
    /// Fallback smoothing weights, used when the ETS fit fails
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for HoltWintersSettings {
    fn default() -> Self {
        Self {
            period: 7,
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.1,
        }
    }
}

/// Fit an additive Holt-Winters model and forecast `horizon` steps.
///
/// Requires at least two full seasons.
pub fn holt_winters_forecast(
    values: &[f64],
    horizon: usize,
    settings: &HoltWintersSettings,
) -> Result<Vec<f64>> {
    let period = settings.period;
    if period < 2 {
        return Err(ForecastError::InvalidParameter {
            param: "holt_winters.period".into(),
            value: period.to_string(),
            reason: "season length must be at least 2".into(),
        });
    }
    if values.len() < 2 * period {
        return Err(ForecastError::InsufficientData {
            needed: 2 * period,
            got: values.len(),
        });
    }

    match forecast_with_ets(values, horizon, period) {
        Ok(point) if point.len() == horizon && point.iter().all(|v| v.is_finite()) => Ok(point),
        Ok(point) => {
            warn!(
                returned = point.len(),
                horizon, "ETS returned an unusable forecast, using additive recursion"
            );
            Ok(additive_recursion(values, horizon, settings))
        }
        Err(e) => {
            warn!(error = %e, "ETS fit failed, using additive recursion");
            Ok(additive_recursion(values, horizon, settings))
        }
    }
}

fn forecast_with_ets(values: &[f64], horizon: usize, period: usize) -> Result<Vec<f64>> {
    let spec = ETSSpec::from_notation("AAA")
        .map_err(|e| ForecastError::ComputationError(format!("Invalid ETS spec: {}", e)))?;

    let time_series = TimeSeriesBuilder::new()
        .values(values.to_vec())
        .build()
        .map_err(|e| {
            ForecastError::ComputationError(format!("Failed to build TimeSeries: {}", e))
        })?;

    let mut forecaster = ETSModel::new(spec, period);
    forecaster
        .fit(&time_series)
        .map_err(|e| ForecastError::ComputationError(format!("Failed to fit ETS model: {}", e)))?;

    let forecast = forecaster.predict(horizon).map_err(|e| {
        ForecastError::ComputationError(format!("Failed to generate ETS forecasts: {}", e))
    })?;

    debug!(spec = %spec.short_name(), period, "Fitted ETS");
    Ok(forecast.point().first().cloned().unwrap_or_default())
}

/// Closed-form additive Holt-Winters with fixed smoothing weights.
fn additive_recursion(values: &[f64], horizon: usize, settings: &HoltWintersSettings) -> Vec<f64> {
    let p = settings.period;
    let (alpha, beta, gamma) = (settings.alpha, settings.beta, settings.gamma);

    let first_mean = values[..p].iter().sum::<f64>() / p as f64;
    let second_mean = values[p..2 * p].iter().sum::<f64>() / p as f64;
    let mut level = first_mean;
    let mut trend = (second_mean - first_mean) / p as f64;
    let mut seasonal: Vec<f64> = values[..p].iter().map(|v| v - first_mean).collect();

    for (i, &v) in values.iter().enumerate().skip(p) {
        let s_idx = i % p;
        let prev_level = level;
        level = alpha * (v - seasonal[s_idx]) + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        seasonal[s_idx] = gamma * (v - level) + (1.0 - gamma) * seasonal[s_idx];
    }

    (1..=horizon)
        .map(|h| level + trend * h as f64 + seasonal[(values.len() + h - 1) % p])
        .collect()
}

/// Holt-Winters adapter. Refits on the current daily series every call.
#[derive(Debug, Clone)]
pub struct HoltWintersForecaster {
    series: Arc<DailySeries>,
    settings: HoltWintersSettings,
}

impl HoltWintersForecaster {
    pub fn new(series: Arc<DailySeries>, settings: HoltWintersSettings) -> Self {
        Self { series, settings }
    }
}

impl Forecaster for HoltWintersForecaster {
    fn name(&self) -> &str {
        "Holt-Winters"
    }

    fn forecast(&self, horizon: usize, include_ground_truth: bool) -> Result<ForecastRun> {
        run_with_policy(&self.series, horizon, include_ground_truth, |_| {
            holt_winters_forecast(self.series.values(), horizon, &self.settings)
        })
    }
}
