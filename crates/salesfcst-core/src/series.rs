//! Date-indexed daily aggregate series.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One value per distinct calendar date, sorted ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DailySeries {
    /// Create a series from parallel date and value vectors.
    ///
    /// Dates must be strictly increasing.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ForecastError::InvalidInput(format!(
                "Series dates must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }
        Ok(Self { dates, values })
    }

    /// Create a daily series of consecutive days starting at `start`.
    pub fn consecutive(start: NaiveDate, values: Vec<f64>) -> Self {
        let dates = start.iter_days().take(values.len()).collect();
        Self { dates, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// The last `n` values (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[f64] {
        let start = self.values.len().saturating_sub(n);
        &self.values[start..]
    }

    /// Iterate `(date, value)` pairs in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// The last `horizon` known values, used to score a forecast of the same length.
    pub fn ground_truth(&self, horizon: usize) -> Result<Vec<f64>> {
        if horizon > self.len() {
            return Err(ForecastError::InsufficientHistory {
                horizon,
                available: self.len(),
            });
        }
        Ok(self.tail(horizon).to_vec())
    }

    /// Restrict the series to `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let (dates, values) = self
            .iter()
            .filter(|(d, _)| *d >= start && *d <= end)
            .unzip();
        Self { dates, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_rejects_unsorted_dates() {
        let result = DailySeries::new(vec![date(2024, 1, 2), date(2024, 1, 1)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::InvalidInput(_))));
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = DailySeries::new(vec![date(2024, 1, 1)], vec![1.0, 2.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_consecutive_and_tail() {
        let series = DailySeries::consecutive(date(2024, 1, 30), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.last_date(), Some(date(2024, 2, 2)));
        assert_eq!(series.tail(2), &[3.0, 4.0]);
        assert_eq!(series.tail(10), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ground_truth_requires_enough_history() {
        let series = DailySeries::consecutive(date(2024, 1, 1), vec![5.0, 6.0, 7.0]);
        assert_eq!(series.ground_truth(2).unwrap(), vec![6.0, 7.0]);
        assert!(matches!(
            series.ground_truth(4),
            Err(ForecastError::InsufficientHistory {
                horizon: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_between_is_inclusive() {
        let series = DailySeries::consecutive(date(2024, 1, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let sub = series.between(date(2024, 1, 2), date(2024, 1, 4));
        assert_eq!(sub.values(), &[2.0, 3.0, 4.0]);
    }
}
