//! End-to-end tests of the command layer against a generated sales file.

use chrono::{Duration, NaiveDate};
use clap::Parser;
use salesfcst_cli::settings::{load_settings, Overrides};
use salesfcst_cli::{exit_code, run, Cli, Command, RangeArgs, Session};
use salesfcst_core::ForecastError;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration as StdDuration, SystemTime};
use tempfile::TempDir;

const DAYS: usize = 60;

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Two products over `DAYS` days with a weekly pattern and deterministic noise.
fn write_sales_csv(dir: &Path) -> PathBuf {
    let weekly = [0.0, 4.0, 8.0, 6.0, 2.0, -5.0, -3.0];
    let mut csv = String::from(
        "Date,Store ID,Product ID,Category,Region,Inventory Level,Units Sold,Units Ordered,Demand Forecast,Price,Discount,Weather Condition,Holiday/Promotion,Competitor Pricing,Seasonality\n",
    );
    for i in 0..DAYS {
        let date = first_day() + Duration::days(i as i64);
        let noise = ((i * 37) % 11) as f64;
        let a = 60.0 + weekly[i % 7] + noise;
        let b = 30.0 + 0.5 * weekly[(i + 3) % 7] + ((i * 13) % 5) as f64;
        let promo = u8::from(i % 10 == 0);
        writeln!(
            csv,
            "{date},S1,P1,Toys,North,{},{},{},{},9.99,0,Sunny,{promo},10.5,Winter",
            200 + i,
            a - 2.0,
            a,
            a + 1.0
        )
        .unwrap();
        writeln!(
            csv,
            "{date},S1,P2,Food,South,{},{},{},{},4.50,5,Rainy,{promo},4.2,Winter",
            80,
            b - 1.0,
            b,
            b - 3.0
        )
        .unwrap();
    }
    let path = dir.join("sales.csv");
    fs::write(&path, csv).unwrap();
    path
}

struct Fixture {
    dir: TempDir,
    data: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data = write_sales_csv(dir.path());
        Self { dir, data }
    }

    fn models_dir(&self) -> PathBuf {
        self.dir.path().join("models")
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        let data = self.data.to_string_lossy().into_owned();
        let models = self.models_dir().to_string_lossy().into_owned();
        let mut argv = vec!["salesfcst", "--data", data.as_str(), "--models-dir", models.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        run(&cli)
    }
}

fn forecast_error(err: &anyhow::Error) -> &ForecastError {
    err.downcast_ref::<ForecastError>()
        .unwrap_or_else(|| panic!("expected a ForecastError, got {:#}", err))
}

#[test]
fn test_summary_text() {
    let fx = Fixture::new();
    let out = fx.run(&["summary"]).unwrap();
    assert!(out.contains(&format!("Records:               {}", 2 * DAYS)));
    assert!(out.contains("Date span:             2024-01-01 .. 2024-02-29"));
    assert!(out.contains("Unique products:       2"));
    assert!(out.contains("Units sold by category"));
    assert!(out.contains("Promotion impact"));
}

#[test]
fn test_summary_json_for_range() {
    let fx = Fixture::new();
    let out = fx
        .run(&["--json", "summary", "--start", "2024-01-01", "--end", "2024-01-10"])
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["summary"]["records"], 20);
    assert_eq!(value["by_category"].as_array().unwrap().len(), 2);
}

#[test]
fn test_empty_range_is_not_an_error() {
    let fx = Fixture::new();
    let out = fx
        .run(&["summary", "--start", "2030-01-01", "--end", "2030-02-01"])
        .unwrap();
    assert_eq!(out, "No records between 2030-01-01 and 2030-02-01.\n");
}

#[test]
fn test_forecast_export() {
    let fx = Fixture::new();
    let output = fx.dir.path().join("forecast.csv");
    let output_arg = output.to_string_lossy().into_owned();
    let out = fx
        .run(&["forecast", "--model", "LagRegression", "--days", "7", "--output", &output_arg])
        .unwrap();
    assert!(out.starts_with("LagRegression forecast (7 days)"));

    let written = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], "Date,Predicted Demand");
    assert!(lines[1].starts_with("2024-03-01,"));
    assert!(lines[7].starts_with("2024-03-07,"));
    for line in &lines[1..] {
        let value: f64 = line.split(',').nth(1).unwrap().parse().unwrap();
        assert!(value >= 0.0);
    }
}

#[test]
fn test_forecast_errors_map_to_core_errors() {
    let fx = Fixture::new();

    let err = fx.run(&["forecast", "--model", "ARIMA", "--days", "5"]).unwrap_err();
    assert!(matches!(forecast_error(&err), ForecastError::ModelNotFound(_)));
    assert_eq!(forecast_error(&err).to_code(), 12);

    let err = fx.run(&["forecast", "--model", "xgboost"]).unwrap_err();
    assert!(matches!(forecast_error(&err), ForecastError::InvalidModel(_)));

    let err = fx.run(&["forecast", "--days", "0"]).unwrap_err();
    assert!(matches!(
        forecast_error(&err),
        ForecastError::InvalidParameter { .. }
    ));

    for model in ["LagRegression", "Prophet", "Holt-Winters"] {
        let err = fx
            .run(&["forecast", "--model", model, "--days", "100000000000"])
            .unwrap_err();
        assert!(
            matches!(forecast_error(&err), ForecastError::InvalidParameter { param, .. } if param == "horizon"),
            "{}: {:#}",
            model,
            err
        );
    }
}

#[test]
fn test_missing_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.csv");
    let cli = Cli::try_parse_from([
        "salesfcst",
        "--data",
        missing.to_str().unwrap(),
        "summary",
    ])
    .unwrap();
    let err = run(&cli).unwrap_err();
    assert!(matches!(forecast_error(&err), ForecastError::Io(_)));
    assert!(format!("{:#}", err).contains("nope.csv"));
}

#[test]
fn test_train_status_compare() {
    let fx = Fixture::new();

    let status: serde_json::Value =
        serde_json::from_str(&fx.run(&["--json", "status"]).unwrap()).unwrap();
    assert!(status
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["present"] == false));

    let train = fx.run(&["train"]).unwrap();
    assert!(train.contains("arima.json"));
    assert!(!train.contains("failed"), "{}", train);

    let status: serde_json::Value =
        serde_json::from_str(&fx.run(&["--json", "status"]).unwrap()).unwrap();
    let entries = status.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|s| s["present"] == true));

    let table: serde_json::Value =
        serde_json::from_str(&fx.run(&["--json", "compare", "--days", "7"]).unwrap()).unwrap();
    let rows = table["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r["error"].is_null()), "{}", table);
    let maes: Vec<f64> = rows
        .iter()
        .map(|r| r["metrics"]["mae"].as_f64().unwrap())
        .collect();
    assert!(maes.windows(2).all(|w| w[0] <= w[1]));

    let parallel = fx
        .run(&["--json", "compare", "--days", "7", "--parallel"])
        .unwrap();
    let parallel: serde_json::Value = serde_json::from_str(&parallel).unwrap();
    assert_eq!(parallel, table);
}

#[test]
fn test_compare_isolates_untrained_models() {
    let fx = Fixture::new();
    let out = fx
        .run(&["compare", "--days", "7", "-m", "ARIMA", "-m", "Holt-Winters"])
        .unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[2].starts_with("Holt-Winters"));
    assert!(lines[3].starts_with("ARIMA"));
    assert!(lines[3].contains("error:"));
    assert!(out.contains("Best model: Holt-Winters"));
}

#[test]
fn test_swot_and_recommendations() {
    let fx = Fixture::new();
    let swot = fx.run(&["swot"]).unwrap();
    for section in ["Strengths", "Weaknesses", "Opportunities", "Threats"] {
        assert!(swot.contains(section));
    }

    let recs = fx.run(&["recommend", "--date", "2024-02-15"]).unwrap();
    assert!(recs.starts_with("1. Product 'P1' (Category: Toys) historically performs well in the Winter season."));
    assert!(recs.contains("sales spike in the 'North' region"));

    let err = fx.run(&["recommend", "--date", "15/2024/02"]).unwrap_err();
    assert!(matches!(
        forecast_error(&err),
        ForecastError::InvalidDateFormat(_)
    ));
}

#[test]
fn test_batch_runs_commands_in_one_session() {
    let fx = Fixture::new();
    let script = fx.dir.path().join("commands.txt");
    fs::write(
        &script,
        "# nightly report\nsummary --start 2024-01-01 --end 2024-01-10\n\nrecommend --date 2024-02-15\n--json status\n",
    )
    .unwrap();
    let script_arg = script.to_string_lossy().into_owned();

    let out = fx.run(&["batch", &script_arg]).unwrap();
    assert!(out.contains("Records:               20"));
    assert!(out.contains("1. Product 'P1' (Category: Toys)"));
    assert!(out.contains("\"present\": false"));
}

#[test]
fn test_batch_reports_failing_line() {
    let fx = Fixture::new();
    let script = fx.dir.path().join("commands.txt");
    fs::write(&script, "summary\nforecast --model xgboost\nstatus\n").unwrap();
    let script_arg = script.to_string_lossy().into_owned();

    let err = fx.run(&["batch", &script_arg]).unwrap_err();
    assert!(matches!(forecast_error(&err), ForecastError::InvalidModel(_)));
    assert!(format!("{:#}", err).contains("batch line 2"));

    fs::write(&script, "batch\n").unwrap();
    let err = fx.run(&["batch", &script_arg]).unwrap_err();
    assert!(matches!(
        forecast_error(&err),
        ForecastError::InvalidParameter { .. }
    ));
}

#[test]
fn test_session_reuses_dataset_until_file_changes() {
    let fx = Fixture::new();
    let settings = load_settings(&Overrides {
        data_path: Some(fx.data.clone()),
        models_dir: Some(fx.models_dir()),
        ..Overrides::default()
    })
    .unwrap();
    let mut session = Session::new(settings);
    let all = Command::Summary(RangeArgs {
        start: None,
        end: None,
    });

    session.execute(&all, false).unwrap();
    let first = session.dataset().unwrap();
    session.execute(&all, true).unwrap();
    let second = session.dataset().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let file = fs::File::options().write(true).open(&fx.data).unwrap();
    file.set_modified(SystemTime::now() + StdDuration::from_secs(60))
        .unwrap();
    drop(file);

    let reloaded = session.dataset().unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(reloaded.len(), first.len());
}

#[test]
fn test_exit_codes() {
    let fx = Fixture::new();
    let err = fx.run(&["forecast", "--model", "ARIMA", "--days", "5"]).unwrap_err();
    assert_eq!(exit_code(&err), 12);

    let cli = Cli::try_parse_from([
        "salesfcst",
        "--config",
        "/nonexistent/salesfcst.toml",
        "status",
    ])
    .unwrap();
    let err = run(&cli).unwrap_err();
    assert_eq!(exit_code(&err), 1);
}
