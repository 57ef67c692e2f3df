//! Layered configuration and logging setup.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `salesfcst.toml` in the working directory, or the file given by `--config`
//! 3. Environment variables (`SALESFCST__*`, e.g. `SALESFCST__ARIMA__P=3`)
//! 4. Command line flags

use config::{Config, ConfigError, Environment, File};
use salesfcst_core::models::{ArimaOrder, HoltWintersSettings, ProphetSettings, SequenceSettings};
use salesfcst_core::TrainSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "salesfcst";
const ENV_PREFIX: &str = "SALESFCST";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSettings {
    pub data_path: PathBuf,
    pub models_dir: PathBuf,
    pub log_level: String,
    pub log_json: bool,
    /// Default forecast and comparison horizon in days
    pub horizon: usize,
    #[serde(default)]
    pub arima: ArimaOrder,
    #[serde(default)]
    pub holt_winters: HoltWintersSettings,
    #[serde(default)]
    pub prophet: ProphetSettings,
    #[serde(default)]
    pub sequence: SequenceSettings,
}

impl AppSettings {
    pub fn train_settings(&self) -> TrainSettings {
        TrainSettings {
            arima: self.arima,
            holt_winters: self.holt_winters,
            prophet: self.prophet,
            sequence: self.sequence,
        }
    }
}

/// Values given on the command line, applied on top of every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
}

pub fn load_settings(overrides: &Overrides) -> Result<AppSettings, ConfigError> {
    let mut builder = Config::builder()
        .set_default("data_path", "data/sales.csv")?
        .set_default("models_dir", "models")?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("horizon", 30)?;

    builder = match &overrides.config_file {
        Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    if let Some(path) = &overrides.data_path {
        builder = builder.set_override("data_path", path_value(path))?;
    }
    if let Some(path) = &overrides.models_dir {
        builder = builder.set_override("models_dir", path_value(path))?;
    }

    builder.build()?.try_deserialize()
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Output goes to stderr so stdout stays parseable.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("salesfcst_core={level},salesfcst_cli={level}");
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_and_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "horizon = 14\nlog_json = true\n\n[arima]\np = 2\n\n[sequence]\nwindow = 5\n",
        )
        .unwrap();

        let settings = load_settings(&Overrides {
            config_file: Some(path),
            ..Overrides::default()
        })
        .unwrap();
        assert_eq!(settings.horizon, 14);
        assert!(settings.log_json);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.models_dir, PathBuf::from("models"));
        assert_eq!(settings.arima, ArimaOrder { p: 2, d: 1, q: 2 });
        assert_eq!(settings.sequence.window, 5);
        assert_eq!(settings.holt_winters.period, 7);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "data_path = \"from_file.csv\"\n").unwrap();

        let settings = load_settings(&Overrides {
            config_file: Some(path),
            data_path: Some(PathBuf::from("from_flag.csv")),
            models_dir: Some(dir.path().join("m")),
        })
        .unwrap();
        assert_eq!(settings.data_path, PathBuf::from("from_flag.csv"));
        assert_eq!(settings.models_dir, dir.path().join("m"));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = load_settings(&Overrides {
            config_file: Some(PathBuf::from("/nonexistent/salesfcst.toml")),
            ..Overrides::default()
        });
        assert!(result.is_err());
    }
}
