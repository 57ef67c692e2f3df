//! Command line front end for the sales forecasting core.
//!
//! Parses arguments, resolves layered settings, runs one command against the
//! configured dataset and renders the result as text or JSON.

pub mod render;
pub mod settings;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use salesfcst_core::records::parse_date_strict;
use salesfcst_core::{
    compare, compare_parallel, promotion_impact, recommendations, seasonal_demand, swot_analysis,
    units_sold_by_category, units_sold_by_region, DatasetCache, ForecastContext, ForecastError,
    ModelKind, ModelStore, SalesDataset, SalesSummary,
};
use serde::Serialize;
use serde_json::json;
use settings::{AppSettings, Overrides};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "salesfcst", about = "Sales demand forecasting and insights", version)]
pub struct Cli {
    /// Configuration file (defaults to ./salesfcst.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Sales CSV file
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Directory holding trained model artifacts
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            data_path: self.data.clone(),
            models_dir: self.models_dir.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Key figures and breakdowns for a date range
    Summary(RangeArgs),
    /// Forecast future demand with one model
    Forecast(ForecastArgs),
    /// Backtest every model on the most recent days and rank them
    Compare(CompareArgs),
    /// Train and save the persisted models
    Train,
    /// Show which model artifacts exist
    Status,
    /// Rule-based SWOT analysis
    Swot(RangeArgs),
    /// Seasonal product recommendations
    Recommend(RecommendArgs),
    /// Run commands read line by line from a file, or stdin when omitted
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Debug, Args)]
pub struct ForecastArgs {
    /// ARIMA, Holt-Winters, Prophet, Sequence or LagRegression
    #[arg(long, short, default_value = "LagRegression")]
    pub model: String,
    /// Forecast horizon in days
    #[arg(long, short)]
    pub days: Option<usize>,
    /// Write the forecast as CSV to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Backtest horizon in days
    #[arg(long, short)]
    pub days: Option<usize>,
    /// Models to compare (all when omitted)
    #[arg(long = "model", short)]
    pub models: Vec<String>,
    /// Run the models on separate threads
    #[arg(long, action = ArgAction::SetTrue)]
    pub parallel: bool,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Reference date (defaults to the last date in the data)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Command file; `-` or no value reads stdin
    pub file: Option<PathBuf>,
}

/// One line of a batch: a subcommand with its own arguments, without the
/// binary name. Arguments are split on whitespace, so quoting is not
/// supported.
#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
struct BatchLine {
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// State shared by the commands of one invocation.
pub struct Session {
    settings: AppSettings,
    cache: DatasetCache,
}

impl Session {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            cache: DatasetCache::new(),
        }
    }

    pub fn dataset(&mut self) -> Result<Arc<SalesDataset>> {
        let path = self.settings.data_path.clone();
        self.cache
            .load(&path)
            .with_context(|| format!("failed to load sales data from {}", path.display()))
    }

    fn store(&self) -> ModelStore {
        ModelStore::new(&self.settings.models_dir)
    }

    fn context(&mut self) -> Result<ForecastContext> {
        let series = self.dataset()?.daily_demand()?;
        Ok(ForecastContext::new(
            series,
            self.store(),
            self.settings.train_settings(),
        ))
    }

    /// Run one command and return its rendered output.
    pub fn execute(&mut self, command: &Command, as_json: bool) -> Result<String> {
        match command {
            Command::Summary(range) => self.summary(range, as_json),
            Command::Forecast(args) => self.forecast(args, as_json),
            Command::Compare(args) => self.compare(args, as_json),
            Command::Train => self.train(as_json),
            Command::Status => {
                let status = self.store().status();
                if as_json {
                    to_json(&status)
                } else {
                    Ok(render::status(&status))
                }
            }
            Command::Swot(range) => {
                let Some(dataset) = self.filtered(range)? else {
                    return Ok(empty_range_message(range));
                };
                let report = swot_analysis(&dataset);
                if as_json {
                    to_json(&report)
                } else {
                    Ok(render::swot(&report))
                }
            }
            Command::Recommend(args) => self.recommend(args, as_json),
            Command::Batch(args) => match args.file.as_deref() {
                Some(path) if path != Path::new("-") => {
                    let file = File::open(path)
                        .map_err(ForecastError::from)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    self.run_batch(BufReader::new(file), as_json)
                }
                _ => self.run_batch(io::stdin().lock(), as_json),
            },
        }
    }

    /// Run every command in `reader` against this session, so the dataset
    /// is parsed once unless the file changes between commands. Blank lines
    /// and lines starting with `#` are skipped. Stops at the first failure.
    pub fn run_batch<R: BufRead>(&mut self, reader: R, as_json: bool) -> Result<String> {
        let mut out = String::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(ForecastError::from)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = index + 1;
            let parsed = BatchLine::try_parse_from(line.split_whitespace())
                .with_context(|| format!("batch line {}: cannot parse '{}'", lineno, line))?;
            if matches!(parsed.command, Command::Batch(_)) {
                return Err(ForecastError::InvalidParameter {
                    param: "batch".into(),
                    value: line.to_string(),
                    reason: format!("line {} nests another batch", lineno),
                }
                .into());
            }
            let rendered = self
                .execute(&parsed.command, as_json || parsed.json)
                .with_context(|| format!("batch line {}: '{}'", lineno, line))?;
            out.push_str(&rendered);
        }
        Ok(out)
    }

    /// The dataset restricted to `range`, or None if nothing falls inside it.
    fn filtered(&mut self, range: &RangeArgs) -> Result<Option<Arc<SalesDataset>>> {
        let dataset = self.dataset()?;
        if range.start.is_none() && range.end.is_none() {
            return Ok(Some(dataset));
        }
        let Some((first, last)) = dataset.date_range() else {
            return Ok(None);
        };
        let start = optional_date(range.start.as_deref())?.unwrap_or(first);
        let end = optional_date(range.end.as_deref())?.unwrap_or(last);
        let subset = dataset.filter_dates(start, end);
        Ok((!subset.is_empty()).then(|| Arc::new(subset)))
    }

    fn summary(&mut self, range: &RangeArgs, as_json: bool) -> Result<String> {
        let Some(dataset) = self.filtered(range)? else {
            return Ok(empty_range_message(range));
        };
        let summary = SalesSummary::compute(&dataset)?;
        let categories = units_sold_by_category(&dataset);
        let regions = units_sold_by_region(&dataset);
        let seasons = seasonal_demand(&dataset);
        let promotion = promotion_impact(&dataset);
        if as_json {
            to_json(&json!({
                "summary": summary,
                "by_category": categories,
                "by_region": regions,
                "by_season": seasons,
                "promotion": promotion,
            }))
        } else {
            Ok(render::summary(
                &summary,
                &categories,
                &regions,
                &seasons,
                &promotion,
            ))
        }
    }

    fn forecast(&mut self, args: &ForecastArgs, as_json: bool) -> Result<String> {
        let kind: ModelKind = args.model.parse()?;
        let horizon = args.days.unwrap_or(self.settings.horizon);
        let forecaster = kind.build(&self.context()?);
        let run = forecaster
            .forecast(horizon, false)
            .with_context(|| format!("{} forecast failed", kind))?;

        if let Some(path) = &args.output {
            let file = File::create(path)
                .map_err(ForecastError::from)
                .with_context(|| format!("failed to create {}", path.display()))?;
            run.forecast.write_csv(BufWriter::new(file))?;
            info!(path = %path.display(), "Forecast exported");
        }

        if as_json {
            to_json(&json!({
                "model": kind.name(),
                "horizon": horizon,
                "forecast": run.forecast.points(),
            }))
        } else {
            Ok(render::forecast(kind.name(), &run.forecast))
        }
    }

    fn compare(&mut self, args: &CompareArgs, as_json: bool) -> Result<String> {
        let kinds: Vec<ModelKind> = if args.models.is_empty() {
            ModelKind::ALL.to_vec()
        } else {
            args.models
                .iter()
                .map(|m| m.parse())
                .collect::<std::result::Result<_, ForecastError>>()?
        };
        let horizon = args.days.unwrap_or(self.settings.horizon);
        let forecasters = self.context()?.forecasters(&kinds);
        let table = if args.parallel {
            compare_parallel(&forecasters, horizon)
        } else {
            compare(&forecasters, horizon)
        };
        if as_json {
            to_json(&table)
        } else {
            Ok(render::comparison(&table, horizon))
        }
    }

    fn train(&mut self, as_json: bool) -> Result<String> {
        let ctx = self.context()?;
        let reports = ctx.store.train_all(&ctx.series, &ctx.settings);
        if as_json {
            to_json(&reports)
        } else {
            Ok(render::training(&reports))
        }
    }

    fn recommend(&mut self, args: &RecommendArgs, as_json: bool) -> Result<String> {
        let dataset = self.dataset()?;
        let reference = match optional_date(args.date.as_deref())? {
            Some(d) => d,
            None => dataset
                .date_range()
                .map(|(_, last)| last)
                .unwrap_or_else(|| Utc::now().date_naive()),
        };
        let messages = recommendations(&dataset, reference);
        if as_json {
            to_json(&json!({ "date": reference, "recommendations": messages }))
        } else {
            Ok(render::recommendations(&messages))
        }
    }
}

fn optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    Ok(value.map(parse_date_strict).transpose()?)
}

fn empty_range_message(range: &RangeArgs) -> String {
    format!(
        "No records between {} and {}.\n",
        range.start.as_deref().unwrap_or("the first date"),
        range.end.as_deref().unwrap_or("the last date")
    )
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut s = serde_json::to_string_pretty(value).map_err(ForecastError::from)?;
    s.push('\n');
    Ok(s)
}

/// Process exit code for a failed command: the core error code when the
/// root cause is a [`ForecastError`], 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ForecastError>()
        .map(|e| e.to_code())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

/// Resolve settings for `cli`, install logging and run its command.
pub fn run(cli: &Cli) -> Result<String> {
    let settings = settings::load_settings(&cli.overrides()).context("invalid configuration")?;
    settings::init_tracing(&settings.log_level, settings.log_json);
    Session::new(settings).execute(&cli.command, cli.json)
}
