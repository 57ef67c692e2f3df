//! Forecast results and the common interface of every forecasting model.

use crate::artifacts::ModelStore;
use crate::error::{ForecastError, Result};
use crate::models::{
    ArimaForecaster, ArimaOrder, HoltWintersForecaster, HoltWintersSettings,
    LagRegressionForecaster, ProphetForecaster, ProphetSettings, SequenceForecaster,
    SequenceSettings,
};
use crate::series::DailySeries;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

/// Header of the exported forecast file.
pub const EXPORT_HEADER: [&str; 2] = ["Date", "Predicted Demand"];

/// A single forecast value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Contiguous daily forecast. Values are never negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Lay raw predictions on the days following `last_known`, clamping at zero.
    pub fn from_values(last_known: NaiveDate, values: &[f64]) -> Result<Self> {
        let points = forecast_dates(last_known, values.len())?
            .into_iter()
            .zip(values)
            .map(|(date, v)| ForecastPoint {
                date,
                value: v.max(0.0),
            })
            .collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Write the forecast as CSV with a `Date,Predicted Demand` header.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(EXPORT_HEADER)?;
        for p in &self.points {
            wtr.write_record([p.date.format("%Y-%m-%d").to_string(), p.value.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ForecastError::ComputationError(e.to_string()))
    }
}

/// Output of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRun {
    pub forecast: ForecastSeries,
    /// The last `horizon` known values, when requested.
    pub ground_truth: Option<Vec<f64>>,
}

/// A forecasting technique behind a uniform interface.
///
/// Implementations decide privately whether they fit on every call or load
/// a persisted artifact.
pub trait Forecaster: Send + Sync {
    fn name(&self) -> &str;

    fn forecast(&self, horizon: usize, include_ground_truth: bool) -> Result<ForecastRun>;
}

/// The `horizon` days following `last_known`. Fails instead of overflowing
/// past `NaiveDate::MAX`.
pub fn forecast_dates(last_known: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    ensure_horizon_fits(last_known, horizon)?;
    Ok(last_known.iter_days().skip(1).take(horizon).collect())
}

fn ensure_horizon_fits(last_known: NaiveDate, horizon: usize) -> Result<()> {
    last_known
        .checked_add_days(Days::new(horizon as u64))
        .map(|_| ())
        .ok_or_else(|| ForecastError::horizon_out_of_range(horizon, last_known))
}

/// Horizon and ground-truth policy shared by all adapters.
pub(crate) fn run_with_policy(
    history: &DailySeries,
    horizon: usize,
    include_ground_truth: bool,
    predict: impl FnOnce(NaiveDate) -> Result<Vec<f64>>,
) -> Result<ForecastRun> {
    if horizon == 0 {
        return Err(ForecastError::horizon_must_be_positive(horizon));
    }
    let ground_truth = if include_ground_truth {
        Some(history.ground_truth(horizon)?)
    } else {
        None
    };
    let last = history
        .last_date()
        .ok_or_else(|| ForecastError::EmptyDataset("no dated observations".into()))?;
    ensure_horizon_fits(last, horizon)?;
    let raw = predict(last)?;
    if raw.len() != horizon {
        return Err(ForecastError::ComputationError(format!(
            "Model returned {} values for a horizon of {}",
            raw.len(),
            horizon
        )));
    }
    Ok(ForecastRun {
        forecast: ForecastSeries::from_values(last, &raw)?,
        ground_truth,
    })
}

/// Available forecasting models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Arima,
    HoltWinters,
    Prophet,
    /// Windowed sequence model (LSTM slot).
    Sequence,
    /// Lag-feature regression with recursive rollout (LightGBM slot).
    LagRegression,
}

impl std::str::FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ARIMA" => return Ok(ModelKind::Arima),
            "Holt-Winters" => return Ok(ModelKind::HoltWinters),
            "Prophet" => return Ok(ModelKind::Prophet),
            "Sequence" => return Ok(ModelKind::Sequence),
            "LagRegression" => return Ok(ModelKind::LagRegression),
            _ => {}
        }

        match s.to_lowercase().as_str() {
            "arima" => Ok(ModelKind::Arima),
            "holtwinters" | "holt_winters" | "holt-winters" | "hw" => Ok(ModelKind::HoltWinters),
            "prophet" => Ok(ModelKind::Prophet),
            "sequence" | "lstm" => Ok(ModelKind::Sequence),
            "lagregression" | "lag_regression" | "lag-regression" | "lightgbm" => {
                Ok(ModelKind::LagRegression)
            }
            _ => Err(ForecastError::InvalidModel(format!("Unknown model: {}", s))),
        }
    }
}

impl ModelKind {
    /// Every model, in comparison order.
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Arima,
        ModelKind::Prophet,
        ModelKind::HoltWinters,
        ModelKind::Sequence,
        ModelKind::LagRegression,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Arima => "ARIMA",
            ModelKind::HoltWinters => "Holt-Winters",
            ModelKind::Prophet => "Prophet",
            ModelKind::Sequence => "Sequence",
            ModelKind::LagRegression => "LagRegression",
        }
    }

    /// Construct the adapter for this model.
    pub fn build(&self, ctx: &ForecastContext) -> Box<dyn Forecaster> {
        match self {
            ModelKind::Arima => Box::new(ArimaForecaster::new(ctx.store.clone())),
            ModelKind::HoltWinters => Box::new(HoltWintersForecaster::new(
                Arc::clone(&ctx.series),
                ctx.settings.holt_winters,
            )),
            ModelKind::Prophet => Box::new(ProphetForecaster::new(
                Arc::clone(&ctx.series),
                ctx.settings.prophet,
            )),
            ModelKind::Sequence => Box::new(SequenceForecaster::new(
                ctx.store.clone(),
                Arc::clone(&ctx.series),
            )),
            ModelKind::LagRegression => {
                Box::new(LagRegressionForecaster::new(Arc::clone(&ctx.series)))
            }
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of every available model.
pub fn list_models() -> Vec<String> {
    ModelKind::ALL.iter().map(|m| m.name().to_string()).collect()
}

/// Tunable settings of every model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSettings {
    pub arima: ArimaOrder,
    pub holt_winters: HoltWintersSettings,
    pub prophet: ProphetSettings,
    pub sequence: SequenceSettings,
}

/// Everything an adapter may need to produce a forecast.
#[derive(Debug, Clone)]
pub struct ForecastContext {
    pub series: Arc<DailySeries>,
    pub store: ModelStore,
    pub settings: TrainSettings,
}

impl ForecastContext {
    pub fn new(series: DailySeries, store: ModelStore, settings: TrainSettings) -> Self {
        Self {
            series: Arc::new(series),
            store,
            settings,
        }
    }

    /// Adapters for the given models, in the given order.
    pub fn forecasters(&self, kinds: &[ModelKind]) -> Vec<Box<dyn Forecaster>> {
        kinds.iter().map(|k| k.build(self)).collect()
    }
}
