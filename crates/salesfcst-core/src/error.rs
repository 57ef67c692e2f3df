//! Error types for the sales forecasting core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Error types for loading, forecasting and evaluation.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required column '{0}' not found in the data")]
    MissingColumn(String),

    #[error("No data available: {0}")]
    EmptyDataset(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Insufficient history: horizon {horizon} needs {horizon} known values, only {available} available")]
    InsufficientHistory { horizon: usize, available: usize },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Model artifact not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),
}

impl ForecastError {
    /// Stable numeric code per variant, used as the process exit code.
    pub fn to_code(&self) -> i32 {
        match self {
            ForecastError::Io(_) => 1,
            ForecastError::Csv(_) => 2,
            ForecastError::Json(_) => 3,
            ForecastError::MissingColumn(_) => 4,
            ForecastError::EmptyDataset(_) => 5,
            ForecastError::InvalidInput(_) => 6,
            ForecastError::InvalidParameter { .. } => 7,
            ForecastError::InsufficientData { .. } => 8,
            ForecastError::InsufficientHistory { .. } => 9,
            ForecastError::ComputationError(_) => 10,
            ForecastError::InvalidModel(_) => 11,
            ForecastError::ModelNotFound(_) => 12,
            ForecastError::InvalidDateFormat(_) => 13,
        }
    }

    pub(crate) fn horizon_must_be_positive(horizon: usize) -> Self {
        ForecastError::InvalidParameter {
            param: "horizon".into(),
            value: horizon.to_string(),
            reason: "must be a positive number of days".into(),
        }
    }

    pub(crate) fn horizon_out_of_range(horizon: usize, last_known: chrono::NaiveDate) -> Self {
        ForecastError::InvalidParameter {
            param: "horizon".into(),
            value: horizon.to_string(),
            reason: format!("runs past the last representable date after {}", last_known),
        }
    }
}
