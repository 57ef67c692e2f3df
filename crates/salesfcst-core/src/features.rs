//! Calendar and lag feature construction for the daily demand series.
//!
//! Every feature vector that reaches a regression model is produced through a
//! [`FeatureSchema`], so the column order seen at training time and at
//! rollout time is always the same.

use crate::error::{ForecastError, Result};
use crate::series::DailySeries;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Number of lagged target values carried by each row.
pub const N_LAGS: usize = 3;

/// Calendar attributes of a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub quarter: u32,
    pub month: u32,
    pub year: i32,
    pub day_of_year: u32,
    pub day_of_month: u32,
    /// ISO-8601 week number
    pub week_of_year: u32,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day_of_week: date.weekday().num_days_from_monday(),
            quarter: (date.month() - 1) / 3 + 1,
            month: date.month(),
            year: date.year(),
            day_of_year: date.ordinal(),
            day_of_month: date.day(),
            week_of_year: date.iso_week().week(),
        }
    }
}

/// Calendar features, lags and target for one date of the series.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub calendar: CalendarFeatures,
    /// `lags[0]` is the previous day's target.
    pub lags: [Option<f64>; N_LAGS],
    pub target: f64,
}

impl FeatureRow {
    pub fn has_all_lags(&self) -> bool {
        self.lags.iter().all(Option::is_some)
    }
}

/// A column that can take part in a regression design matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    DayOfWeek,
    Quarter,
    Month,
    Year,
    DayOfYear,
    DayOfMonth,
    WeekOfYear,
    Lag1,
    Lag2,
    Lag3,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 10] = [
        FeatureColumn::DayOfWeek,
        FeatureColumn::Quarter,
        FeatureColumn::Month,
        FeatureColumn::Year,
        FeatureColumn::DayOfYear,
        FeatureColumn::DayOfMonth,
        FeatureColumn::WeekOfYear,
        FeatureColumn::Lag1,
        FeatureColumn::Lag2,
        FeatureColumn::Lag3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::DayOfWeek => "dayofweek",
            FeatureColumn::Quarter => "quarter",
            FeatureColumn::Month => "month",
            FeatureColumn::Year => "year",
            FeatureColumn::DayOfYear => "dayofyear",
            FeatureColumn::DayOfMonth => "dayofmonth",
            FeatureColumn::WeekOfYear => "weekofyear",
            FeatureColumn::Lag1 => "lag_1",
            FeatureColumn::Lag2 => "lag_2",
            FeatureColumn::Lag3 => "lag_3",
        }
    }

    fn value(&self, calendar: &CalendarFeatures, lags: &[Option<f64>; N_LAGS]) -> Option<f64> {
        match self {
            FeatureColumn::DayOfWeek => Some(calendar.day_of_week as f64),
            FeatureColumn::Quarter => Some(calendar.quarter as f64),
            FeatureColumn::Month => Some(calendar.month as f64),
            FeatureColumn::Year => Some(calendar.year as f64),
            FeatureColumn::DayOfYear => Some(calendar.day_of_year as f64),
            FeatureColumn::DayOfMonth => Some(calendar.day_of_month as f64),
            FeatureColumn::WeekOfYear => Some(calendar.week_of_year as f64),
            FeatureColumn::Lag1 => lags[0],
            FeatureColumn::Lag2 => lags[1],
            FeatureColumn::Lag3 => lags[2],
        }
    }
}

/// Build one feature row per date of the series.
///
/// The first `N_LAGS` rows have at least one undefined lag.
pub fn build_features(series: &DailySeries) -> Vec<FeatureRow> {
    let values = series.values();
    series
        .dates()
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            let mut lags = [None; N_LAGS];
            for (k, lag) in lags.iter_mut().enumerate() {
                *lag = i.checked_sub(k + 1).map(|j| values[j]);
            }
            FeatureRow {
                date,
                calendar: CalendarFeatures::from_date(date),
                lags,
                target: values[i],
            }
        })
        .collect()
}

/// Rows usable for training: those with every lag defined.
pub fn training_rows(rows: &[FeatureRow]) -> Vec<FeatureRow> {
    rows.iter().filter(|r| r.has_all_lags()).cloned().collect()
}

/// Ordered set of feature columns agreed at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureColumn>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Feature schema needs at least one column".into(),
            ));
        }
        for (i, c) in columns.iter().enumerate() {
            if columns[..i].contains(c) {
                return Err(ForecastError::InvalidInput(format!(
                    "Feature column '{}' listed twice",
                    c.name()
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Choose the columns that carry information over the training rows.
    ///
    /// Columns that are constant, or identical to an earlier column, are
    /// dropped. All rows must have their lags defined.
    pub fn fit(rows: &[FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }
        if !rows.iter().all(FeatureRow::has_all_lags) {
            return Err(ForecastError::InvalidInput(
                "Training rows must have all lags defined".into(),
            ));
        }

        let mut kept: Vec<(FeatureColumn, Vec<f64>)> = Vec::new();
        for column in FeatureColumn::ALL {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|r| column.value(&r.calendar, &r.lags))
                .collect();
            let constant = values.iter().all(|v| *v == values[0]);
            let duplicate = kept.iter().any(|(_, other)| *other == values);
            if !constant && !duplicate {
                kept.push((column, values));
            }
        }

        if kept.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Every feature column is constant over the training rows".into(),
            ));
        }
        Self::new(kept.into_iter().map(|(c, _)| c).collect())
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.columns.iter().map(FeatureColumn::name).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Project a row onto the schema. Fails if a required lag is undefined.
    pub fn vector(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        self.project(&row.calendar, &row.lags).ok_or_else(|| {
            ForecastError::InvalidInput(format!("Row for {} has undefined lags", row.date))
        })
    }

    /// Project synthesized calendar features and known lags onto the schema.
    pub fn vector_from_parts(&self, calendar: &CalendarFeatures, lags: [f64; N_LAGS]) -> Vec<f64> {
        let lags = lags.map(Some);
        self.columns
            .iter()
            .filter_map(|c| c.value(calendar, &lags))
            .collect()
    }

    /// Row-major design matrix for a set of training rows.
    pub fn design_matrix(&self, rows: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.vector(r)).collect()
    }

    fn project(&self, calendar: &CalendarFeatures, lags: &[Option<f64>; N_LAGS]) -> Option<Vec<f64>> {
        self.columns.iter().map(|c| c.value(calendar, lags)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_known_date() {
        let cal = CalendarFeatures::from_date(date(2024, 3, 15));
        assert_eq!(cal.day_of_week, 4);
        assert_eq!(cal.quarter, 1);
        assert_eq!(cal.month, 3);
        assert_eq!(cal.year, 2024);
        assert_eq!(cal.day_of_year, 75);
        assert_eq!(cal.day_of_month, 15);
        assert_eq!(cal.week_of_year, 11);
    }

    #[test]
    fn test_calendar_iso_week_at_year_boundary() {
        // 2021-01-01 is a Friday in ISO week 53 of 2020.
        let cal = CalendarFeatures::from_date(date(2021, 1, 1));
        assert_eq!(cal.week_of_year, 53);
        assert_eq!(cal.quarter, 1);
        let cal = CalendarFeatures::from_date(date(2024, 12, 31));
        assert_eq!(cal.quarter, 4);
        assert_eq!(cal.day_of_year, 366);
    }

    #[test]
    fn test_build_features_lags() {
        let series = DailySeries::consecutive(date(2024, 1, 1), vec![10.0, 20.0, 30.0, 40.0, 50.0]);
        let rows = build_features(&series);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].lags, [None, None, None]);
        assert_eq!(rows[2].lags, [Some(20.0), Some(10.0), None]);
        assert_eq!(rows[4].lags, [Some(40.0), Some(30.0), Some(20.0)]);
        assert_eq!(rows[4].target, 50.0);
    }

    #[test]
    fn test_training_rows_count() {
        for len in 0..8usize {
            let series = DailySeries::consecutive(date(2024, 1, 1), (0..len).map(|v| v as f64).collect());
            let rows = build_features(&series);
            assert_eq!(training_rows(&rows).len(), len.saturating_sub(N_LAGS));
        }
    }

    #[test]
    fn test_build_features_empty() {
        assert!(build_features(&DailySeries::default()).is_empty());
    }

    #[test]
    fn test_schema_drops_constant_and_duplicate_columns() {
        // Ten days inside January: quarter, month and year are constant and
        // day-of-month duplicates day-of-year.
        let values: Vec<f64> = (0..10).map(|v| ((v * 7) % 5) as f64).collect();
        let series = DailySeries::consecutive(date(2024, 1, 1), values);
        let rows = training_rows(&build_features(&series));
        let schema = FeatureSchema::fit(&rows).unwrap();
        let cols = schema.columns();
        assert!(!cols.contains(&FeatureColumn::Quarter));
        assert!(!cols.contains(&FeatureColumn::Month));
        assert!(!cols.contains(&FeatureColumn::Year));
        assert!(cols.contains(&FeatureColumn::DayOfYear));
        assert!(!cols.contains(&FeatureColumn::DayOfMonth));
        assert!(cols.contains(&FeatureColumn::Lag1));
    }

    #[test]
    fn test_schema_vector_order_matches_parts() {
        let series = DailySeries::consecutive(date(2024, 1, 1), (0..40).map(|v| (v % 9) as f64).collect());
        let rows = training_rows(&build_features(&series));
        let schema = FeatureSchema::fit(&rows).unwrap();
        let row = &rows[5];
        let lags = [row.lags[0].unwrap(), row.lags[1].unwrap(), row.lags[2].unwrap()];
        assert_eq!(
            schema.vector(row).unwrap(),
            schema.vector_from_parts(&row.calendar, lags)
        );
    }

    #[test]
    fn test_schema_rejects_rows_without_lags() {
        let series = DailySeries::consecutive(date(2024, 1, 1), vec![1.0, 2.0, 3.0, 4.0]);
        let rows = build_features(&series);
        assert!(FeatureSchema::fit(&rows).is_err());
        assert!(FeatureSchema::fit(&[]).is_err());
    }

    #[test]
    fn test_schema_new_rejects_duplicates() {
        let result = FeatureSchema::new(vec![FeatureColumn::Lag1, FeatureColumn::Lag1]);
        assert!(result.is_err());
        let schema = FeatureSchema::new(vec![FeatureColumn::Lag1, FeatureColumn::DayOfWeek]).unwrap();
        assert_eq!(schema.names(), vec!["lag_1", "dayofweek"]);
    }
}
