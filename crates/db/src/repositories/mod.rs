use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use bakeplan_core::errors::ApplicationError;

pub mod forecast;
pub mod ingredient;
pub mod memory;
pub mod recipe;
pub mod sales;

pub use forecast::SqlForecastRepository;
pub use ingredient::SqlIngredientRepository;
pub use memory::{
    InMemoryForecastRepository, InMemoryIngredientRepository, InMemoryRecipeRepository,
    InMemorySalesHistory,
};
pub use recipe::SqlRecipeRepository;
pub use sales::SqlSalesHistoryProvider;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn decode_column<T>(
    column: &str,
    result: Result<T, sqlx::Error>,
) -> Result<T, RepositoryError> {
    result.map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}
