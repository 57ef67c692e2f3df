//! Sales record loading and the in-memory dataset.
//!
//! The loader reads a delimited file with a header row. Numeric cells that
//! are missing or unparseable become `0.0`; categorical and boolean cells are
//! forward-filled in date order. Rows whose date cannot be parsed are kept
//! (they still count towards per-product totals) but carry `date: None` and
//! are left out of every date-indexed aggregation.

use crate::error::{ForecastError, Result};
use crate::imputation::{fill_forward, fill_forward_text};
use crate::series::DailySeries;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub const DATE: &str = "Date";
pub const STORE_ID: &str = "Store ID";
pub const PRODUCT_ID: &str = "Product ID";
pub const CATEGORY: &str = "Category";
pub const REGION: &str = "Region";
pub const INVENTORY_LEVEL: &str = "Inventory Level";
pub const UNITS_SOLD: &str = "Units Sold";
pub const UNITS_ORDERED: &str = "Units Ordered";
pub const DEMAND_FORECAST: &str = "Demand Forecast";
pub const PRICE: &str = "Price";
pub const DISCOUNT: &str = "Discount";
pub const WEATHER_CONDITION: &str = "Weather Condition";
pub const HOLIDAY_PROMOTION: &str = "Holiday/Promotion";
pub const COMPETITOR_PRICING: &str = "Competitor Pricing";
pub const SEASONALITY: &str = "Seasonality";

/// Columns without which the file cannot be used at all.
pub const REQUIRED_COLUMNS: &[&str] = &[DATE, PRODUCT_ID, UNITS_ORDERED, UNITS_SOLD];

/// Columns that `daily_totals` can aggregate.
pub const NUMERIC_COLUMNS: &[&str] = &[
    INVENTORY_LEVEL,
    UNITS_SOLD,
    UNITS_ORDERED,
    DEMAND_FORECAST,
    PRICE,
    DISCOUNT,
    COMPETITOR_PRICING,
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// One row of the input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesRecord {
    pub date: Option<NaiveDate>,
    pub store_id: Option<String>,
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub inventory_level: f64,
    pub units_sold: f64,
    pub units_ordered: f64,
    pub demand_forecast: f64,
    pub price: f64,
    pub discount: f64,
    pub competitor_pricing: f64,
    pub weather_condition: Option<String>,
    pub holiday_promotion: Option<bool>,
    pub seasonality: Option<String>,
}

impl SalesRecord {
    /// Value of a numeric column by its header name.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            INVENTORY_LEVEL => Some(self.inventory_level),
            UNITS_SOLD => Some(self.units_sold),
            UNITS_ORDERED => Some(self.units_ordered),
            DEMAND_FORECAST => Some(self.demand_forecast),
            PRICE => Some(self.price),
            DISCOUNT => Some(self.discount),
            COMPETITOR_PRICING => Some(self.competitor_pricing),
            _ => None,
        }
    }

    pub fn is_promotion(&self) -> bool {
        self.holiday_promotion.unwrap_or(false)
    }
}

/// Header name to field index lookup.
struct ColumnMap {
    indices: HashMap<String, usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let indices = headers
            .iter()
            .enumerate()
            .map(|(i, field)| (field.trim().to_string(), i))
            .collect();
        ColumnMap { indices }
    }

    fn get<'a>(&self, record: &'a csv::StringRecord, col: &str) -> Option<&'a str> {
        self.indices
            .get(col)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn names(&self) -> HashSet<String> {
        self.indices.keys().cloned().collect()
    }

    fn validate_required(&self) -> Result<()> {
        match REQUIRED_COLUMNS
            .iter()
            .find(|col| !self.indices.contains_key(**col))
        {
            Some(missing) => Err(ForecastError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}

/// Parse a date cell, accepting the common ISO, slash and datetime layouts.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a user-supplied date, failing with `InvalidDateFormat`.
pub fn parse_date_strict(s: &str) -> Result<NaiveDate> {
    parse_date(s).ok_or_else(|| ForecastError::InvalidDateFormat(s.to_string()))
}

fn parse_number(s: Option<&str>) -> Option<f64> {
    s.and_then(|v| v.replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_flag(s: Option<&str>) -> Option<bool> {
    let s = s?.to_ascii_lowercase();
    match s.as_str() {
        "0" | "0.0" | "false" | "no" | "n" | "f" => Some(false),
        _ => Some(true),
    }
}

/// The loaded sales records, sorted by date with undated rows last.
#[derive(Debug, Clone, Default)]
pub struct SalesDataset {
    records: Vec<SalesRecord>,
    columns: HashSet<String>,
}

impl SalesDataset {
    /// Load a dataset from a CSV file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Loaded sales data"
        );
        Ok(dataset)
    }

    /// Load a dataset from any CSV source with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = ColumnMap::from_headers(rdr.headers()?);
        columns.validate_required()?;

        let mut records = Vec::new();
        let mut undated = 0usize;
        for row in rdr.records() {
            let row = row?;
            let date = columns.get(&row, DATE).and_then(parse_date);
            if date.is_none() {
                undated += 1;
            }
            let number = |col: &str| parse_number(columns.get(&row, col)).unwrap_or(0.0);
            let text = |col: &str| columns.get(&row, col).map(str::to_string);
            records.push(SalesRecord {
                date,
                store_id: text(STORE_ID),
                product_id: text(PRODUCT_ID),
                category: text(CATEGORY),
                region: text(REGION),
                inventory_level: number(INVENTORY_LEVEL),
                units_sold: number(UNITS_SOLD),
                units_ordered: number(UNITS_ORDERED),
                demand_forecast: number(DEMAND_FORECAST),
                price: number(PRICE),
                discount: number(DISCOUNT),
                competitor_pricing: number(COMPETITOR_PRICING),
                weather_condition: text(WEATHER_CONDITION),
                holiday_promotion: parse_flag(columns.get(&row, HOLIDAY_PROMOTION)),
                seasonality: text(SEASONALITY),
            });
        }
        if undated > 0 {
            warn!(
                rows = undated,
                "Rows with unparseable dates are excluded from date aggregation"
            );
        }

        Ok(Self::from_records(records, columns.names()))
    }

    /// Build a dataset from already-typed records.
    ///
    /// Records are sorted by date (stable, undated last) and categorical
    /// fields are forward-filled in that order.
    pub fn from_records(mut records: Vec<SalesRecord>, columns: HashSet<String>) -> Self {
        records.sort_by_key(|r| (r.date.is_none(), r.date));
        forward_fill(&mut records);
        Self { records, columns }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the source file carried a header with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Rows with a valid date.
    pub fn dated(&self) -> impl Iterator<Item = (NaiveDate, &SalesRecord)> {
        self.records
            .iter()
            .filter_map(|r| r.date.map(|d| (d, r)))
    }

    /// First and last valid date.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.dated().map(|(d, _)| d);
        let first = dates.next()?;
        let last = dates.last().unwrap_or(first);
        Some((first, last))
    }

    /// Keep only records dated within `start..=end`.
    pub fn filter_dates(&self, start: NaiveDate, end: NaiveDate) -> SalesDataset {
        let records = self
            .records
            .iter()
            .filter(|r| matches!(r.date, Some(d) if d >= start && d <= end))
            .cloned()
            .collect();
        SalesDataset {
            records,
            columns: self.columns.clone(),
        }
    }

    /// Sum a numeric column per calendar date.
    pub fn daily_totals(&self, column: &str) -> Result<DailySeries> {
        if !self.has_column(column) || !NUMERIC_COLUMNS.contains(&column) {
            return Err(ForecastError::MissingColumn(column.to_string()));
        }
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, record) in self.dated() {
            *totals.entry(date).or_insert(0.0) += record.numeric(column).unwrap_or(0.0);
        }
        let (dates, values) = totals.into_iter().unzip();
        DailySeries::new(dates, values)
    }

    /// Daily demand: total `Units Ordered` per date.
    pub fn daily_demand(&self) -> Result<DailySeries> {
        self.daily_totals(UNITS_ORDERED)
    }
}

fn forward_fill(records: &mut [SalesRecord]) {
    fn fill_text(
        records: &mut [SalesRecord],
        field: fn(&mut SalesRecord) -> &mut Option<String>,
    ) {
        let mut column: Vec<Option<String>> =
            records.iter_mut().map(|r| field(r).take()).collect();
        fill_forward_text(&mut column);
        for (record, value) in records.iter_mut().zip(column) {
            *field(record) = value;
        }
    }

    fill_text(records, |r| &mut r.store_id);
    fill_text(records, |r| &mut r.product_id);
    fill_text(records, |r| &mut r.category);
    fill_text(records, |r| &mut r.region);
    fill_text(records, |r| &mut r.weather_condition);
    fill_text(records, |r| &mut r.seasonality);

    let flags: Vec<Option<bool>> = records.iter().map(|r| r.holiday_promotion).collect();
    for (record, flag) in records.iter_mut().zip(fill_forward(&flags)) {
        record.holiday_promotion = flag;
    }
}
