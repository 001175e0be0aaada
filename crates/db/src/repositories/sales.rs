use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use bakeplan_core::domain::recipe::RecipeId;
use bakeplan_core::domain::sales::SalesRecord;
use bakeplan_core::errors::ApplicationError;
use bakeplan_core::ports::SalesHistoryProvider;

use super::{decode_column, format_timestamp, parse_timestamp, RepositoryError};
use crate::DbPool;

/// Reads sale events from `sales_event`, joined with the recipe name.
pub struct SqlSalesHistoryProvider {
    pool: DbPool,
    as_of: Option<DateTime<Utc>>,
}

impl SqlSalesHistoryProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, as_of: None }
    }

    /// Pins the end of the history window instead of using the current time.
    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    async fn load(
        &self,
        recipe_id: &RecipeId,
        days_back: u32,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        let until = self.as_of.unwrap_or_else(Utc::now);
        let since = until - Duration::days(i64::from(days_back));

        let rows = sqlx::query(
            "SELECT s.sold_at, s.quantity, s.recipe_id, r.name AS recipe_name
             FROM sales_event s
             JOIN recipe r ON r.id = s.recipe_id
             WHERE s.recipe_id = ? AND s.sold_at >= ? AND s.sold_at <= ?
             ORDER BY s.sold_at ASC, s.id ASC",
        )
        .bind(recipe_id.0)
        .bind(format_timestamp(since))
        .bind(format_timestamp(until))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SalesRecord, RepositoryError> {
                let sold_at: String = decode_column("sold_at", row.try_get("sold_at"))?;
                Ok(SalesRecord {
                    sold_at: parse_timestamp("sold_at", &sold_at)?,
                    quantity: decode_column("quantity", row.try_get("quantity"))?,
                    recipe_id: RecipeId(decode_column("recipe_id", row.try_get("recipe_id"))?),
                    recipe_name: decode_column("recipe_name", row.try_get("recipe_name"))?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SalesHistoryProvider for SqlSalesHistoryProvider {
    async fn get_history(
        &self,
        recipe_id: &RecipeId,
        days_back: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        Ok(self.load(recipe_id, days_back).await?)
    }
}

/// Appends one sale event.
pub async fn record_sale(
    pool: &DbPool,
    recipe_id: &RecipeId,
    sold_at: DateTime<Utc>,
    quantity: f64,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO sales_event (recipe_id, sold_at, quantity) VALUES (?, ?, ?)")
        .bind(recipe_id.0)
        .bind(format_timestamp(sold_at))
        .bind(quantity)
        .execute(pool)
        .await?;
    Ok(())
}
