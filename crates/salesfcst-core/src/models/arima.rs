//! ARIMA(p,d,q) estimated by two-stage least squares (Hannan–Rissanen).
//!
//! 1. Difference the series `d` times.
//! 2. If `q > 0`, fit a long autoregression and keep its residuals as
//!    innovation estimates.
//! 3. Regress the differenced series on `p` of its own lags and `q` lagged
//!    innovations.
//!
//! Forecasts set future innovations to zero and are integrated back `d` times.

use crate::artifacts::ModelStore;
use crate::error::{ForecastError, Result};
use crate::forecast::{run_with_policy, ForecastRun, Forecaster};
use crate::regression::LinearModel;
use crate::series::DailySeries;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_LONG_AR: usize = 20;

/// ARIMA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 5, d: 1, q: 2 }
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// A fitted ARIMA model together with the state needed to forecast from the
/// end of its training series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaModel {
    pub order: ArimaOrder,
    pub intercept: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Last `p` values of the differenced series, oldest first.
    recent: Vec<f64>,
    /// Last `q` in-sample innovations, oldest first.
    innovations: Vec<f64>,
    /// Last value of each differencing level below `d`.
    anchors: Vec<f64>,
    /// Training series. Supplies the forecast origin and ground truth.
    pub history: DailySeries,
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Rows `[w[t-1]..w[t-p], e[t-1]..e[t-q]]` and targets `w[t]` for `t` in `start..`.
fn lagged_design(w: &[f64], e: &[f64], p: usize, q: usize, start: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    (start..w.len())
        .map(|t| {
            let row = (1..=p)
                .map(|i| w[t - i])
                .chain((1..=q).map(|j| e[t - j]))
                .collect();
            (row, w[t])
        })
        .unzip()
}

impl ArimaModel {
    pub fn fit(series: &DailySeries, order: ArimaOrder) -> Result<Self> {
        let ArimaOrder { p, d, q } = order;
        if d > 2 {
            return Err(ForecastError::InvalidParameter {
                param: "arima.d".into(),
                value: d.to_string(),
                reason: "differencing order must be 0, 1 or 2".into(),
            });
        }

        let mut levels = vec![series.values().to_vec()];
        for _ in 0..d {
            let next = difference(&levels[levels.len() - 1]);
            levels.push(next);
        }
        let w = levels.pop().unwrap_or_default();
        let n = w.len();

        let long = if q > 0 {
            (p + q).max((n / 4).min(MAX_LONG_AR)).max(1)
        } else {
            0
        };
        let start = if q > 0 { (long + q).max(p) } else { p };
        let k = p + q;
        let mut needed = start + k + 2;
        if q > 0 {
            needed = needed.max(2 * long + 2);
        }
        if n < needed {
            return Err(ForecastError::InsufficientData {
                needed: needed + d,
                got: series.len(),
            });
        }
        let anchors: Vec<f64> = levels.iter().filter_map(|l| l.last().copied()).collect();

        let mut e = vec![0.0; n];
        if q > 0 {
            let (x, y) = lagged_design(&w, &[], long, 0, long);
            let long_ar = LinearModel::fit(&x, &y)?;
            for (t, row) in (long..n).zip(&x) {
                e[t] = w[t] - long_ar.predict(row)?;
            }
        }

        let (intercept, ar, ma, innovations) = if k == 0 {
            let mean = w.iter().sum::<f64>() / n as f64;
            (mean, Vec::new(), Vec::new(), Vec::new())
        } else {
            let (x, y) = lagged_design(&w, &e, p, q, start);
            let model = LinearModel::fit(&x, &y)?;
            let mut eps = vec![0.0; n];
            for (t, row) in (start..n).zip(&x) {
                eps[t] = w[t] - model.predict(row)?;
            }
            let ar = model.coefficients[..p].to_vec();
            let ma = model.coefficients[p..].to_vec();
            (model.intercept, ar, ma, eps[n - q..].to_vec())
        };

        debug!(order = %order, n, intercept, "Fitted ARIMA");
        Ok(Self {
            order,
            intercept,
            ar,
            ma,
            recent: w[n - p..].to_vec(),
            innovations,
            anchors,
            history: series.clone(),
        })
    }

    /// Point forecasts for the `horizon` days after the training series.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut w = self.recent.clone();
        let mut e = self.innovations.clone();
        let mut diffs = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let ar: f64 = self
                .ar
                .iter()
                .enumerate()
                .map(|(i, c)| c * w[w.len() - 1 - i])
                .sum();
            let ma: f64 = self
                .ma
                .iter()
                .enumerate()
                .map(|(j, c)| c * e[e.len() - 1 - j])
                .sum();
            let next = self.intercept + ar + ma;
            w.push(next);
            e.push(0.0);
            diffs.push(next);
        }

        for &anchor in self.anchors.iter().rev() {
            let mut acc = anchor;
            for v in diffs.iter_mut() {
                acc += *v;
                *v = acc;
            }
        }
        diffs
    }
}

/// ARIMA adapter. Loads the persisted model on every call.
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    store: ModelStore,
}

impl ArimaForecaster {
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }
}

impl Forecaster for ArimaForecaster {
    fn name(&self) -> &str {
        "ARIMA"
    }

    fn forecast(&self, horizon: usize, include_ground_truth: bool) -> Result<ForecastRun> {
        let model = self.store.load_arima()?;
        run_with_policy(&model.history, horizon, include_ground_truth, |_| {
            Ok(model.forecast(horizon))
        })
    }
}
