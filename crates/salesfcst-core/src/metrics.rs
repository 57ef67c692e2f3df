//! Forecast accuracy metrics.
//!
//! | Metric | Use When |
//! |--------|----------|
//! | MAE | Need interpretable error in original units |
//! | RMSE | Want to penalize large errors more heavily |

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Calculates Mean Absolute Error between actual and predicted values.
///
/// # Formula
/// MAE = (1/n) * Σ|actual_i - forecast_i|
///
/// # Example
/// ```
/// use salesfcst_core::metrics::mae;
/// let actual = vec![1.0, 2.0, 3.0];
/// let forecast = vec![1.1, 2.2, 2.8];
/// let error = mae(&actual, &forecast).unwrap();
/// assert!((error - 0.166).abs() < 0.01);
/// ```
pub fn mae(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Calculates Mean Squared Error between actual and predicted values.
///
/// # Formula
/// MSE = (1/n) * Σ(actual_i - forecast_i)²
pub fn mse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Calculates Root Mean Squared Error. Always at least the MAE.
pub fn rmse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    mse(actual, forecast).map(|v| v.sqrt())
}

/// MAE and RMSE of one forecast against its ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub mae: f64,
    pub rmse: f64,
}

/// Score a forecast against the values that actually occurred.
pub fn evaluate(actual: &[f64], forecast: &[f64]) -> Result<ErrorSummary> {
    Ok(ErrorSummary {
        mae: mae(actual, forecast)?,
        rmse: rmse(actual, forecast)?,
    })
}

fn validate_inputs(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.len() != forecast.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Actual and forecast arrays must have the same length: {} vs {}",
            actual.len(),
            forecast.len()
        )));
    }
    if actual.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Cannot evaluate an empty forecast".into(),
        ));
    }
    Ok(())
}
