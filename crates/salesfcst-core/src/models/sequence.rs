//! Sliding-window sequence model.
//!
//! The series is min-max scaled, and the next scaled value is predicted from
//! the previous `window` scaled values with a linear read-out. Multi-step
//! forecasts slide the window over the model's own predictions.

use crate::artifacts::ModelStore;
use crate::error::{ForecastError, Result};
use crate::forecast::{run_with_policy, ForecastRun, Forecaster};
use crate::regression::LinearModel;
use crate::series::DailySeries;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    /// Number of past values fed to the read-out
    pub window: usize,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self { window: 10 }
    }
}

/// Maps the training range onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn transform(&self, v: f64) -> f64 {
        let range = self.range();
        if range > 0.0 {
            (v - self.min) / range
        } else {
            0.0
        }
    }

    pub fn inverse(&self, v: f64) -> f64 {
        v * self.range() + self.min
    }
}

/// Trained window regression plus the scaler it was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceModel {
    pub window: usize,
    pub scaler: MinMaxScaler,
    pub readout: LinearModel,
}

impl SequenceModel {
    pub fn fit(series: &DailySeries, settings: &SequenceSettings) -> Result<Self> {
        let window = settings.window;
        if window == 0 {
            return Err(ForecastError::InvalidParameter {
                param: "sequence.window".into(),
                value: "0".into(),
                reason: "window must hold at least one value".into(),
            });
        }
        let values = series.values();
        let needed = 2 * window + 2;
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let scaler = MinMaxScaler::fit(values)?;
        if scaler.range() == 0.0 {
            warn!("Constant training series, sequence model predicts its level");
            return Ok(Self {
                window,
                scaler,
                readout: LinearModel {
                    intercept: 0.0,
                    coefficients: vec![0.0; window],
                },
            });
        }

        let scaled: Vec<f64> = values.iter().map(|v| scaler.transform(*v)).collect();
        let (x, y): (Vec<Vec<f64>>, Vec<f64>) = scaled
            .windows(window + 1)
            .map(|w| (w[..window].to_vec(), w[window]))
            .unzip();
        let readout = LinearModel::fit(&x, &y)?;

        debug!(window, samples = y.len(), "Fitted sequence model");
        Ok(Self {
            window,
            scaler,
            readout,
        })
    }

    /// Forecast `horizon` steps after the end of `recent`.
    pub fn forecast(&self, recent: &[f64], horizon: usize) -> Result<Vec<f64>> {
        if recent.len() < self.window {
            return Err(ForecastError::InsufficientData {
                needed: self.window,
                got: recent.len(),
            });
        }
        let mut buffer: VecDeque<f64> = recent[recent.len() - self.window..]
            .iter()
            .map(|v| self.scaler.transform(*v))
            .collect();

        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let x: Vec<f64> = buffer.iter().copied().collect();
            let next = self.readout.predict(&x)?;
            out.push(self.scaler.inverse(next));
            buffer.pop_front();
            buffer.push_back(next);
        }
        Ok(out)
    }
}

/// Sequence adapter. Loads the persisted model and forecasts from the end of
/// the current daily series.
#[derive(Debug, Clone)]
pub struct SequenceForecaster {
    store: ModelStore,
    series: Arc<DailySeries>,
}

impl SequenceForecaster {
    pub fn new(store: ModelStore, series: Arc<DailySeries>) -> Self {
        Self { store, series }
    }
}

impl Forecaster for SequenceForecaster {
    fn name(&self) -> &str {
        "Sequence"
    }

    fn forecast(&self, horizon: usize, include_ground_truth: bool) -> Result<ForecastRun> {
        let model = self.store.load_sequence()?;
        run_with_policy(&self.series, horizon, include_ground_truth, |_| {
            model.forecast(self.series.values(), horizon)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_scaler() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, 15.0]).unwrap();
        assert_relative_eq!(scaler.transform(15.0), 0.5);
        assert_relative_eq!(scaler.inverse(0.25), 12.5);
        let flat = MinMaxScaler::fit(&[3.0, 3.0]).unwrap();
        assert_relative_eq!(flat.transform(3.0), 0.0);
        assert_relative_eq!(flat.inverse(0.0), 3.0);
        assert!(MinMaxScaler::fit(&[]).is_err());
    }

    #[test]
    fn test_learns_linear_recurrence() {
        // x_t = 0.5 * x_{t-1} + 0.3 * x_{t-2} + 10, with window 2
        let mut values = vec![40.0, 60.0];
        for _ in 0..40 {
            let n = values.len();
            values.push(0.5 * values[n - 1] + 0.3 * values[n - 2] + 10.0 + (n % 3) as f64);
        }
        let series = DailySeries::consecutive(start(), values.clone());
        let model = SequenceModel::fit(&series, &SequenceSettings { window: 2 }).unwrap();
        let fc = model.forecast(&values, 1).unwrap();
        let n = values.len();
        let expected = 0.5 * values[n - 1] + 0.3 * values[n - 2] + 10.0 + (n % 3) as f64;
        // The (n % 3) term is unmodelled noise of magnitude below 2.
        assert!((fc[0] - expected).abs() < 3.0);
    }

    #[test]
    fn test_constant_series() {
        let series = DailySeries::consecutive(start(), vec![7.0; 30]);
        let model = SequenceModel::fit(&series, &SequenceSettings::default()).unwrap();
        let fc = model.forecast(series.values(), 4).unwrap();
        assert_eq!(fc, vec![7.0; 4]);
    }

    #[test]
    fn test_insufficient_history() {
        let series = DailySeries::consecutive(start(), vec![1.0; 21]);
        let err = SequenceModel::fit(&series, &SequenceSettings::default()).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { needed: 22, got: 21 }));

        let model = SequenceModel::fit(
            &DailySeries::consecutive(start(), (0..30).map(|v| ((v * v) % 17) as f64).collect()),
            &SequenceSettings::default(),
        )
        .unwrap();
        assert!(model.forecast(&[1.0, 2.0], 3).is_err());
    }
}
