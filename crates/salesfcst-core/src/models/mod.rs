//! Forecasting model adapters.
//!
//! | Model | Acquisition | Technique |
//! |-------|-------------|-----------|
//! | ARIMA | persisted artifact | Hannan–Rissanen ARIMA(p,d,q) |
//! | Holt-Winters | fit per call | additive ETS with weekly season |
//! | Prophet | fit per call | piecewise-linear trend + Fourier seasonality |
//! | Sequence | persisted artifact | scaled sliding-window regression |
//! | LagRegression | fit per call | lag-feature regression + recursive rollout |

pub mod arima;
pub mod holt_winters;
pub mod lag_regression;
pub mod prophet;
pub mod sequence;

pub use arima::{ArimaForecaster, ArimaModel, ArimaOrder};
pub use holt_winters::{HoltWintersForecaster, HoltWintersSettings};
pub use lag_regression::{LagRegressionForecaster, LagRegressionModel};
pub use prophet::{ProphetForecaster, ProphetModel, ProphetSettings};
pub use sequence::{MinMaxScaler, SequenceForecaster, SequenceModel, SequenceSettings};
