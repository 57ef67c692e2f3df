//! Persisted model artifacts.
//!
//! Each trained model is stored as one JSON file in the models directory.

use crate::error::{ForecastError, Result};
use crate::forecast::TrainSettings;
use crate::models::{ArimaModel, LagRegressionModel, SequenceModel};
use crate::series::DailySeries;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Models that are trained ahead of time and stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    Arima,
    Sequence,
    LagRegression,
}

impl Artifact {
    pub const ALL: [Artifact; 3] = [Artifact::Arima, Artifact::Sequence, Artifact::LagRegression];

    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Arima => "arima.json",
            Artifact::Sequence => "sequence.json",
            Artifact::LagRegression => "lag_regression.json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Artifact::Arima => "ARIMA",
            Artifact::Sequence => "Sequence",
            Artifact::LagRegression => "LagRegression",
        }
    }
}

/// Presence and age of one artifact file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
    pub model: &'static str,
    pub path: PathBuf,
    pub present: bool,
    pub modified: Option<DateTime<Utc>>,
}

/// Outcome of training one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainReport {
    pub model: &'static str,
    /// Where the artifact was written, if training succeeded
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

impl TrainReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Directory holding the JSON artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    fn save<T: Serialize>(&self, artifact: Artifact, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(artifact);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(path)
    }

    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<T> {
        let path = self.path(artifact);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ForecastError::ModelNotFound(path))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save_arima(&self, model: &ArimaModel) -> Result<PathBuf> {
        self.save(Artifact::Arima, model)
    }

    pub fn load_arima(&self) -> Result<ArimaModel> {
        self.load(Artifact::Arima)
    }

    pub fn save_sequence(&self, model: &SequenceModel) -> Result<PathBuf> {
        self.save(Artifact::Sequence, model)
    }

    pub fn load_sequence(&self) -> Result<SequenceModel> {
        self.load(Artifact::Sequence)
    }

    pub fn save_lag_regression(&self, model: &LagRegressionModel) -> Result<PathBuf> {
        self.save(Artifact::LagRegression, model)
    }

    pub fn load_lag_regression(&self) -> Result<LagRegressionModel> {
        self.load(Artifact::LagRegression)
    }

    /// File status of every artifact.
    pub fn status(&self) -> Vec<ArtifactStatus> {
        Artifact::ALL
            .iter()
            .map(|a| {
                let path = self.path(*a);
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                ArtifactStatus {
                    model: a.label(),
                    present: path.is_file(),
                    path,
                    modified,
                }
            })
            .collect()
    }

    /// Fit and save every persisted model. A failure is recorded in its
    /// report and does not stop the remaining models.
    pub fn train_all(&self, series: &DailySeries, settings: &TrainSettings) -> Vec<TrainReport> {
        Artifact::ALL
            .iter()
            .map(|a| {
                let outcome = match a {
                    Artifact::Arima => ArimaModel::fit(series, settings.arima)
                        .and_then(|m| self.save_arima(&m)),
                    Artifact::Sequence => SequenceModel::fit(series, &settings.sequence)
                        .and_then(|m| self.save_sequence(&m)),
                    Artifact::LagRegression => LagRegressionModel::fit(series)
                        .and_then(|m| self.save_lag_regression(&m)),
                };
                match outcome {
                    Ok(path) => {
                        info!(model = a.label(), path = %path.display(), "Saved model");
                        TrainReport {
                            model: a.label(),
                            path: Some(path),
                            error: None,
                        }
                    }
                    Err(e) => {
                        warn!(model = a.label(), error = %e, "Training failed");
                        TrainReport {
                            model: a.label(),
                            path: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect()
    }
}
