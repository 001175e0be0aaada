use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::recipe::RecipeId;
use crate::domain::sales::DailyPoint;
use crate::errors::DomainError;

pub const WINDOW_SIZE_RANGE: RangeInclusive<usize> = 3..=14;
pub const FORECAST_DAYS_RANGE: RangeInclusive<usize> = 7..=90;
pub const HISTORY_DAYS_RANGE: RangeInclusive<u32> = 1..=1825;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastId(pub String);

impl fmt::Display for ForecastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operator-tunable knobs for one forecast request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastParams {
    pub history_days: u32,
    pub forecast_days: usize,
    pub window_size: usize,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self { history_days: 365, forecast_days: 7, window_size: 7 }
    }
}

impl ForecastParams {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_window_size(self.window_size)?;
        validate_forecast_days(self.forecast_days)?;
        if !HISTORY_DAYS_RANGE.contains(&self.history_days) {
            return Err(DomainError::invalid(
                "history_days",
                format!(
                    "must be in range {}..={}",
                    HISTORY_DAYS_RANGE.start(),
                    HISTORY_DAYS_RANGE.end()
                ),
            ));
        }
        Ok(())
    }

    /// Smallest number of observed days that allows training.
    pub fn minimum_history(&self) -> usize {
        self.window_size * 2
    }
}

pub fn validate_window_size(window_size: usize) -> Result<(), DomainError> {
    if WINDOW_SIZE_RANGE.contains(&window_size) {
        return Ok(());
    }
    Err(DomainError::invalid(
        "window_size",
        format!("must be in range {}..={}", WINDOW_SIZE_RANGE.start(), WINDOW_SIZE_RANGE.end()),
    ))
}

pub fn validate_forecast_days(forecast_days: usize) -> Result<(), DomainError> {
    if FORECAST_DAYS_RANGE.contains(&forecast_days) {
        return Ok(());
    }
    Err(DomainError::invalid(
        "forecast_days",
        format!(
            "must be in range {}..={}",
            FORECAST_DAYS_RANGE.start(),
            FORECAST_DAYS_RANGE.end()
        ),
    ))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub dates: Vec<NaiveDate>,
    pub predicted_quantities: Vec<f64>,
    /// Fit-quality score in `[0, 1]`, not a statistical interval.
    pub confidence_level: f64,
    pub factors: BTreeMap<String, Value>,
}

impl ForecastResult {
    pub fn total_quantity(&self) -> f64 {
        self.predicted_quantities.iter().sum()
    }

    pub fn points(&self) -> Vec<DailyPoint> {
        self.dates
            .iter()
            .zip(&self.predicted_quantities)
            .map(|(date, quantity)| DailyPoint { date: *date, quantity: *quantity })
            .collect()
    }
}

/// A saved forecast. Records are write-once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub id: ForecastId,
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub dates: Vec<NaiveDate>,
    pub predicted_quantities: Vec<f64>,
    pub confidence_level: f64,
    pub factors: BTreeMap<String, Value>,
    pub time_series_data: Vec<DailyPoint>,
}

#[cfg(test)]
mod tests {
    use super::ForecastParams;
    use crate::errors::DomainError;

    #[test]
    fn defaults_are_valid() {
        let params = ForecastParams::default();
        params.validate().expect("defaults should validate");
        assert_eq!(params.minimum_history(), 14);
    }

    #[test]
    fn out_of_range_knobs_name_the_offending_field() {
        let cases = [
            (ForecastParams { window_size: 2, ..ForecastParams::default() }, "window_size"),
            (ForecastParams { window_size: 15, ..ForecastParams::default() }, "window_size"),
            (ForecastParams { forecast_days: 6, ..ForecastParams::default() }, "forecast_days"),
            (ForecastParams { forecast_days: 91, ..ForecastParams::default() }, "forecast_days"),
            (ForecastParams { history_days: 0, ..ForecastParams::default() }, "history_days"),
        ];

        for (params, expected) in cases {
            let error = params.validate().expect_err("should reject");
            assert!(
                matches!(error, DomainError::InvalidInput { field, .. } if field == expected),
                "expected {expected} failure, got {error:?}"
            );
        }
    }
}
