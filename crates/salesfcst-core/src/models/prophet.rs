//! Decomposable trend + seasonality model in the style of Prophet.
//!
//! `y(t) = k·t + Σ δ_j·(t − c_j)₊ + weekly(t) + yearly(t) + m`
//!
//! The trend is piecewise linear with changepoints `c_j` spread over the
//! first part of the history. Seasonal components are Fourier series over the
//! day index. All parameters are estimated jointly by least squares.

use crate::error::{ForecastError, Result};
use crate::forecast::{forecast_dates, run_with_policy, ForecastRun, Forecaster};
use crate::regression::LinearModel;
use crate::series::DailySeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

const WEEK: f64 = 7.0;
const YEAR: f64 = 365.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphetSettings {
    /// Number of potential trend changepoints
    pub changepoints: usize,
    /// Fraction of the history in which changepoints may fall
    pub changepoint_range: f64,
    pub weekly_order: usize,
    pub yearly_order: usize,
    /// Minimum history span in days before weekly terms are added
    pub weekly_min_days: i64,
    /// Minimum history span in days before yearly terms are added
    pub yearly_min_days: i64,
}

impl Default for ProphetSettings {
    fn default() -> Self {
        Self {
            changepoints: 5,
            changepoint_range: 0.8,
            weekly_order: 3,
            yearly_order: 10,
            weekly_min_days: 14,
            yearly_min_days: 730,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphetModel {
    start: NaiveDate,
    span_days: f64,
    /// Changepoint locations on the scaled time axis
    changepoints: Vec<f64>,
    weekly_order: usize,
    yearly_order: usize,
    model: LinearModel,
}

fn fourier_terms(day: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let x = 2.0 * PI * k as f64 * day / period;
        out.push(x.sin());
        out.push(x.cos());
    }
}

impl ProphetModel {
    pub fn fit(series: &DailySeries, settings: &ProphetSettings) -> Result<Self> {
        let (start, end) = match (series.first_date(), series.last_date()) {
            (Some(s), Some(e)) if series.len() >= 3 => (s, e),
            _ => {
                return Err(ForecastError::InsufficientData {
                    needed: 3,
                    got: series.len(),
                })
            }
        };
        if !(0.0..=1.0).contains(&settings.changepoint_range) {
            return Err(ForecastError::InvalidParameter {
                param: "prophet.changepoint_range".into(),
                value: settings.changepoint_range.to_string(),
                reason: "must lie between 0 and 1".into(),
            });
        }

        let n = series.len();
        let span = (end - start).num_days();
        let span_days = span.max(1) as f64;
        let t: Vec<f64> = series
            .dates()
            .iter()
            .map(|d| (*d - start).num_days() as f64 / span_days)
            .collect();

        let mut weekly_order = if span >= settings.weekly_min_days {
            settings.weekly_order
        } else {
            0
        };
        let mut yearly_order = if span >= settings.yearly_min_days {
            settings.yearly_order
        } else {
            0
        };
        let mut n_changepoints = settings.changepoints;

        // Shrink the design until it is identifiable.
        let n_columns = |cp: usize, w: usize, y: usize| 1 + cp + 2 * w + 2 * y;
        while n_columns(n_changepoints, weekly_order, yearly_order) + 2 > n {
            if n_changepoints > 0 {
                n_changepoints -= 1;
            } else if yearly_order > 0 {
                yearly_order = 0;
            } else if weekly_order > 0 {
                weekly_order = 0;
            } else {
                break;
            }
        }

        let changepoints = select_changepoints(&t, n_changepoints, settings.changepoint_range);
        let mut model = Self {
            start,
            span_days,
            changepoints,
            weekly_order,
            yearly_order,
            model: LinearModel {
                intercept: 0.0,
                coefficients: Vec::new(),
            },
        };

        let x: Vec<Vec<f64>> = series.dates().iter().map(|d| model.design_row(*d)).collect();
        model.model = LinearModel::fit(&x, series.values())?;

        debug!(
            n,
            changepoints = model.changepoints.len(),
            weekly_order,
            yearly_order,
            "Fitted Prophet-style model"
        );
        Ok(model)
    }

    fn design_row(&self, date: NaiveDate) -> Vec<f64> {
        let day = (date - self.start).num_days() as f64;
        let t = day / self.span_days;
        let mut row = Vec::with_capacity(1 + self.changepoints.len() + 2 * (self.weekly_order + self.yearly_order));
        row.push(t);
        row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));
        fourier_terms(day, WEEK, self.weekly_order, &mut row);
        fourier_terms(day, YEAR, self.yearly_order, &mut row);
        row
    }

    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<f64>> {
        dates
            .iter()
            .map(|d| self.model.predict(&self.design_row(*d)))
            .collect()
    }

    /// Predict the `horizon` days following `last`.
    pub fn forecast_after(&self, last: NaiveDate, horizon: usize) -> Result<Vec<f64>> {
        self.predict(&forecast_dates(last, horizon)?)
    }
}

/// Evenly spaced changepoints within the first `range` of the history,
/// placed on observed time points.
fn select_changepoints(t: &[f64], n_changepoints: usize, range: f64) -> Vec<f64> {
    let hist = ((t.len() as f64) * range).floor() as usize;
    if n_changepoints == 0 || hist < 2 {
        return Vec::new();
    }
    let last_idx = (hist - 1) as f64;
    let mut cps: Vec<f64> = (1..=n_changepoints)
        .map(|j| {
            let idx = (last_idx * j as f64 / n_changepoints as f64).round() as usize;
            t[idx]
        })
        .filter(|c| *c > 0.0)
        .collect();
    cps.dedup();
    cps
}

/// Prophet adapter. Refits on the current daily series every call.
#[derive(Debug, Clone)]
pub struct ProphetForecaster {
    series: Arc<DailySeries>,
    settings: ProphetSettings,
}

impl ProphetForecaster {
    pub fn new(series: Arc<DailySeries>, settings: ProphetSettings) -> Self {
        Self { series, settings }
    }
}

impl Forecaster for ProphetForecaster {
    fn name(&self) -> &str {
        "Prophet"
    }

    fn forecast(&self, horizon: usize, include_ground_truth: bool) -> Result<ForecastRun> {
        run_with_policy(&self.series, horizon, include_ground_truth, |last| {
            ProphetModel::fit(&self.series, &self.settings)?.forecast_after(last, horizon)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_select_changepoints() {
        let t: Vec<f64> = (0..11).map(|i| i as f64 / 10.0).collect();
        let cps = select_changepoints(&t, 4, 0.8);
        // First 8 points, last index 7: indices 2, 4, 5, 7.
        assert_eq!(cps.len(), 4);
        assert!(cps.iter().all(|c| *c <= 0.7 + 1e-12));
        assert!(select_changepoints(&t, 0, 0.8).is_empty());
    }

    #[test]
    fn test_recovers_trend_and_weekly_pattern() {
        let pattern = [0.0, 4.0, 8.0, 6.0, 2.0, -5.0, -3.0];
        let values: Vec<f64> = (0..84)
            .map(|i| 20.0 + 0.5 * i as f64 + pattern[i % 7])
            .collect();
        let series = DailySeries::consecutive(start(), values);
        let model = ProphetModel::fit(&series, &ProphetSettings::default()).unwrap();
        let last = series.last_date().unwrap();
        let fc = model.forecast_after(last, 7).unwrap();
        for (h, v) in fc.iter().enumerate() {
            let i = 84 + h;
            assert_relative_eq!(*v, 20.0 + 0.5 * i as f64 + pattern[i % 7], epsilon = 1e-4);
        }
    }

    #[test]
    fn test_short_history_drops_seasonality() {
        let series = DailySeries::consecutive(start(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let model = ProphetModel::fit(&series, &ProphetSettings::default()).unwrap();
        assert_eq!(model.weekly_order, 0);
        assert_eq!(model.yearly_order, 0);
        let fc = model.forecast_after(series.last_date().unwrap(), 2).unwrap();
        assert_relative_eq!(fc[0], 6.0, epsilon = 1e-6);
        assert_relative_eq!(fc[1], 7.0, epsilon = 1e-6);
    }

    #[test]
    fn test_too_short() {
        let series = DailySeries::consecutive(start(), vec![1.0, 2.0]);
        assert!(matches!(
            ProphetModel::fit(&series, &ProphetSettings::default()),
            Err(ForecastError::InsufficientData { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn test_adapter() {
        let values: Vec<f64> = (0..40).map(|i| 50.0 + (i % 7) as f64).collect();
        let adapter = ProphetForecaster::new(
            Arc::new(DailySeries::consecutive(start(), values)),
            ProphetSettings::default(),
        );
        let run = adapter.forecast(5, true).unwrap();
        assert_eq!(run.forecast.len(), 5);
        assert_eq!(run.ground_truth.map(|g| g.len()), Some(5));
    }
}
