use async_trait::async_trait;
use sqlx::Row;

use bakeplan_core::domain::recipe::{IngredientId, IngredientStock};
use bakeplan_core::errors::ApplicationError;
use bakeplan_core::ports::IngredientRepository;

use super::{decode_column, parse_decimal, RepositoryError};
use crate::DbPool;

pub struct SqlIngredientRepository {
    pool: DbPool,
}

impl SqlIngredientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, id: &IngredientId) -> Result<Option<IngredientStock>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, unit, current_stock, category FROM ingredient WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_stock(r)?)),
            None => Ok(None),
        }
    }
}

fn row_to_stock(row: &sqlx::sqlite::SqliteRow) -> Result<IngredientStock, RepositoryError> {
    let stock: String = decode_column("current_stock", row.try_get("current_stock"))?;
    Ok(IngredientStock {
        ingredient_id: IngredientId(decode_column("id", row.try_get("id"))?),
        name: decode_column("name", row.try_get("name"))?,
        unit: decode_column("unit", row.try_get("unit"))?,
        current_stock: parse_decimal("current_stock", &stock)?,
        category: decode_column("category", row.try_get("category"))?,
    })
}

#[async_trait]
impl IngredientRepository for SqlIngredientRepository {
    async fn get_current_stock(
        &self,
        ingredient_id: &IngredientId,
    ) -> Result<Option<IngredientStock>, ApplicationError> {
        Ok(self.load(ingredient_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use bakeplan_core::domain::recipe::IngredientId;
    use bakeplan_core::ports::IngredientRepository;

    use super::SqlIngredientRepository;
    use crate::repositories::test_support::{insert_ingredient, setup};

    #[tokio::test]
    async fn stock_is_read_with_unit_and_category() {
        let pool = setup().await;
        insert_ingredient(&pool, 7, "Rye flour", "kg", "18.75").await;

        let repository = SqlIngredientRepository::new(pool);
        let stock =
            repository.get_current_stock(&IngredientId(7)).await.expect("load").expect("present");

        assert_eq!(stock.name, "Rye flour");
        assert_eq!(stock.unit, "kg");
        assert_eq!(stock.category, "dry goods");
        assert_eq!(stock.current_stock, Decimal::new(1875, 2));
    }

    #[tokio::test]
    async fn missing_ingredient_is_none() {
        let repository = SqlIngredientRepository::new(setup().await);
        assert!(repository.get_current_stock(&IngredientId(1)).await.expect("load").is_none());
    }
}
