//! Recursive multi-step forecasting over lag features.
//!
//! A single-step model is applied once per future day. Each prediction is fed
//! back as the newest lag for the following day.

use crate::error::{ForecastError, Result};
use crate::features::{CalendarFeatures, FeatureRow, FeatureSchema, N_LAGS};
use crate::forecast::{forecast_dates, ForecastSeries};
use crate::regression::LinearModel;
use tracing::debug;

/// A model that predicts one value from one feature vector.
pub trait RowModel {
    fn predict_row(&self, features: &[f64]) -> Result<f64>;
}

impl RowModel for LinearModel {
    fn predict_row(&self, features: &[f64]) -> Result<f64> {
        self.predict(features)
    }
}

/// The three most recent target values, newest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagState {
    pub lag1: f64,
    pub lag2: f64,
    pub lag3: f64,
}

impl LagState {
    /// Seed from the last historical row: its target becomes lag-1 and its
    /// own lags shift down by one.
    pub fn seed(last: &FeatureRow) -> Option<Self> {
        Some(Self {
            lag1: last.target,
            lag2: last.lags[0]?,
            lag3: last.lags[1]?,
        })
    }

    /// Shift in a new most recent value.
    pub fn push(&mut self, value: f64) {
        self.lag3 = self.lag2;
        self.lag2 = self.lag1;
        self.lag1 = value;
    }

    pub fn as_array(&self) -> [f64; N_LAGS] {
        [self.lag1, self.lag2, self.lag3]
    }
}

/// Result of a rollout: the clamped forecast plus the final lag state.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    pub forecast: ForecastSeries,
    /// Unclamped model outputs, one per step.
    pub raw: Vec<f64>,
    /// `None` only for a zero horizon.
    pub lag_state: Option<LagState>,
}

/// Forecast `horizon` days past the end of `history`.
///
/// The last history row must have every lag defined. A zero horizon returns
/// an empty rollout without touching the model.
pub fn recursive_forecast<M: RowModel + ?Sized>(
    history: &[FeatureRow],
    schema: &FeatureSchema,
    model: &M,
    horizon: usize,
) -> Result<Rollout> {
    if horizon == 0 {
        return Ok(Rollout {
            forecast: ForecastSeries::default(),
            raw: Vec::new(),
            lag_state: None,
        });
    }

    let last = history.last().ok_or(ForecastError::InsufficientData {
        needed: N_LAGS + 1,
        got: 0,
    })?;
    // The last row has all lags only when at least N_LAGS rows precede it.
    let mut state = last
        .has_all_lags()
        .then(|| LagState::seed(last))
        .flatten()
        .ok_or(ForecastError::InsufficientData {
            needed: N_LAGS + 1,
            got: history.len(),
        })?;

    let dates = forecast_dates(last.date, horizon)?;
    let mut raw = Vec::with_capacity(horizon);
    for date in dates {
        let calendar = CalendarFeatures::from_date(date);
        let x = schema.vector_from_parts(&calendar, state.as_array());
        let prediction = model.predict_row(&x)?;
        raw.push(prediction);
        state.push(prediction);
    }

    debug!(horizon, last_date = %last.date, "Recursive rollout complete");
    Ok(Rollout {
        forecast: ForecastSeries::from_values(last.date, &raw)?,
        raw,
        lag_state: Some(state),
    })
}
