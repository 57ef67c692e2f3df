//! Ordinary least squares model shared by every regression-based forecaster.

use crate::error::{ForecastError, Result};
use anofox_regression::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fitted linear model: `y = intercept + coefficients · x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit an OLS regression with intercept on row-major observations.
    pub fn fit(rows: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        let n = y.len();
        if rows.len() != n {
            return Err(ForecastError::InvalidInput(format!(
                "Design matrix has {} rows but target has {} values",
                rows.len(),
                n
            )));
        }
        let k = rows.first().map_or(0, Vec::len);
        if k == 0 {
            return Err(ForecastError::InvalidInput(
                "Design matrix has no columns".into(),
            ));
        }
        if rows.iter().any(|r| r.len() != k) {
            return Err(ForecastError::InvalidInput(
                "Design matrix rows have different lengths".into(),
            ));
        }
        // One observation per coefficient plus the intercept, plus one spare.
        if n < k + 2 {
            return Err(ForecastError::InsufficientData {
                needed: k + 2,
                got: n,
            });
        }

        let x_mat = faer::Mat::from_fn(n, k, |i, j| rows[i][j]);
        let y_col = faer::Col::from_fn(n, |i| y[i]);

        let fitted = OlsRegressor::builder()
            .with_intercept(true)
            .build()
            .fit(&x_mat, &y_col)
            .map_err(|e| ForecastError::ComputationError(format!("OLS fit failed: {}", e)))?;

        let intercept = fitted.intercept().unwrap_or(0.0);
        let coeffs_col = fitted.coefficients();
        let mut coefficients = Vec::with_capacity(k);
        let mut aliased = 0;
        for i in 0..coeffs_col.nrows() {
            let c = coeffs_col[i];
            if c.is_finite() {
                coefficients.push(c);
            } else {
                aliased += 1;
                coefficients.push(0.0);
            }
        }
        if aliased > 0 {
            warn!(aliased, "Collinear regressors set to zero");
        }
        if !intercept.is_finite() {
            return Err(ForecastError::ComputationError(
                "OLS produced a non-finite intercept".into(),
            ));
        }

        debug!(n, k, intercept, "Fitted linear model");
        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Predict a single observation. `x` must have `n_features()` values.
    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.coefficients.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Feature vector has {} values, model expects {}",
                x.len(),
                self.coefficients.len()
            )));
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(b, v)| b * v)
                .sum::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_recovers_exact_plane() {
        // y = 3 + 2*x1 - 0.5*x2
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 11) as f64])
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let model = LinearModel::fit(&rows, &y).unwrap();
        assert_relative_eq!(model.intercept, 3.0, epsilon = 1e-8);
        assert_relative_eq!(model.coefficients[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(model.coefficients[1], -0.5, epsilon = 1e-8);
        assert_relative_eq!(model.predict(&[10.0, 4.0]).unwrap(), 21.0, epsilon = 1e-8);
    }

    #[test]
    fn test_fit_rejects_bad_shapes() {
        assert!(matches!(
            LinearModel::fit(&[vec![1.0]], &[1.0, 2.0]),
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(matches!(
            LinearModel::fit(&[vec![], vec![]], &[1.0, 2.0]),
            Err(ForecastError::InvalidInput(_))
        ));
        assert!(matches!(
            LinearModel::fit(&[vec![1.0, 2.0], vec![1.0]], &[1.0, 2.0]),
            Err(ForecastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fit_needs_more_rows_than_columns() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 1.0], vec![3.0, 5.0]];
        assert!(matches!(
            LinearModel::fit(&rows, &[1.0, 2.0, 3.0]),
            Err(ForecastError::InsufficientData { needed: 4, got: 3 })
        ));
    }

    #[test]
    fn test_predict_length_mismatch() {
        let model = LinearModel {
            intercept: 1.0,
            coefficients: vec![1.0, 2.0],
        };
        assert!(model.predict(&[1.0]).is_err());
        assert_relative_eq!(model.predict(&[1.0, 1.0]).unwrap(), 4.0);
    }
}
