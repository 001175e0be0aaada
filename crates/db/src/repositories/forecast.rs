use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::Row;

use bakeplan_core::domain::forecast::{ForecastId, ForecastRecord};
use bakeplan_core::domain::recipe::RecipeId;
use bakeplan_core::domain::sales::DailyPoint;
use bakeplan_core::errors::ApplicationError;
use bakeplan_core::ports::ForecastRepository;

use super::{decode_column, format_timestamp, parse_date, parse_timestamp, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, recipe_id, recipe_name, start_date, end_date,
        dates_json, predicted_quantities_json, confidence_level, factors_json,
        time_series_json, created_at
 FROM forecast";

/// Write-once forecast table. There is deliberately no update statement.
pub struct SqlForecastRepository {
    pool: DbPool,
}

impl SqlForecastRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &ForecastRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO forecast (id, recipe_id, recipe_name, start_date, end_date,
                                   dates_json, predicted_quantities_json, confidence_level,
                                   factors_json, time_series_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(record.recipe_id.0)
        .bind(&record.recipe_name)
        .bind(record.start_date.to_string())
        .bind(record.end_date.to_string())
        .bind(to_json(&record.dates)?)
        .bind(to_json(&record.predicted_quantities)?)
        .bind(record.confidence_level)
        .bind(to_json(&record.factors)?)
        .bind(to_json(&record.time_series_data)?)
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select_many(
        &self,
        recipe_id: Option<&RecipeId>,
    ) -> Result<Vec<ForecastRecord>, RepositoryError> {
        let rows = match recipe_id {
            Some(recipe_id) => {
                sqlx::query(&format!(
                    "{SELECT_COLUMNS} WHERE recipe_id = ? ORDER BY created_at DESC, rowid DESC"
                ))
                .bind(recipe_id.0)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_forecast).collect()
    }

    async fn select_one(&self, id: &ForecastId) -> Result<Option<ForecastRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_forecast(r)?)),
            None => Ok(None),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

fn row_to_forecast(row: &sqlx::sqlite::SqliteRow) -> Result<ForecastRecord, RepositoryError> {
    let start_date: String = decode_column("start_date", row.try_get("start_date"))?;
    let end_date: String = decode_column("end_date", row.try_get("end_date"))?;
    let created_at: String = decode_column("created_at", row.try_get("created_at"))?;
    let dates_json: String = decode_column("dates_json", row.try_get("dates_json"))?;
    let predicted_json: String =
        decode_column("predicted_quantities_json", row.try_get("predicted_quantities_json"))?;
    let factors_json: String = decode_column("factors_json", row.try_get("factors_json"))?;
    let time_series_json: String =
        decode_column("time_series_json", row.try_get("time_series_json"))?;

    let dates: Vec<NaiveDate> = from_json("dates_json", &dates_json)?;
    let predicted_quantities: Vec<f64> = from_json("predicted_quantities_json", &predicted_json)?;
    if dates.len() != predicted_quantities.len() {
        return Err(RepositoryError::Decode(
            "forecast dates and predicted quantities are misaligned".to_string(),
        ));
    }
    let factors: BTreeMap<String, Value> = from_json("factors_json", &factors_json)?;
    let time_series_data: Vec<DailyPoint> = from_json("time_series_json", &time_series_json)?;

    Ok(ForecastRecord {
        id: ForecastId(decode_column("id", row.try_get("id"))?),
        recipe_id: RecipeId(decode_column("recipe_id", row.try_get("recipe_id"))?),
        recipe_name: decode_column("recipe_name", row.try_get("recipe_name"))?,
        start_date: parse_date("start_date", &start_date)?,
        end_date: parse_date("end_date", &end_date)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        dates,
        predicted_quantities,
        confidence_level: decode_column("confidence_level", row.try_get("confidence_level"))?,
        factors,
        time_series_data,
    })
}

#[async_trait]
impl ForecastRepository for SqlForecastRepository {
    async fn create(&self, record: ForecastRecord) -> Result<(), ApplicationError> {
        Ok(self.insert(&record).await?)
    }

    async fn find_many(
        &self,
        recipe_id: Option<&RecipeId>,
    ) -> Result<Vec<ForecastRecord>, ApplicationError> {
        Ok(self.select_many(recipe_id).await?)
    }

    async fn find_by_id(&self, id: &ForecastId) -> Result<Option<ForecastRecord>, ApplicationError> {
        Ok(self.select_one(id).await?)
    }
}
