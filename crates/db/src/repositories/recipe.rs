use async_trait::async_trait;
use sqlx::Row;

use bakeplan_core::domain::recipe::{BomLine, IngredientId, RecipeBom, RecipeId};
use bakeplan_core::errors::ApplicationError;
use bakeplan_core::ports::RecipeRepository;

use super::{decode_column, parse_decimal, RepositoryError};
use crate::DbPool;

pub struct SqlRecipeRepository {
    pool: DbPool,
}

impl SqlRecipeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_bom(&self, recipe_id: &RecipeId) -> Result<Option<RecipeBom>, RepositoryError> {
        let Some(row) = sqlx::query("SELECT id, name, yield_quantity FROM recipe WHERE id = ?")
            .bind(recipe_id.0)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let name: String = decode_column("name", row.try_get("name"))?;
        let yield_raw: String = decode_column("yield_quantity", row.try_get("yield_quantity"))?;

        let lines = sqlx::query(
            "SELECT ingredient_id, quantity_per_yield
             FROM recipe_ingredient
             WHERE recipe_id = ?
             ORDER BY position ASC",
        )
        .bind(recipe_id.0)
        .fetch_all(&self.pool)
        .await?;

        let ingredients = lines
            .iter()
            .map(|line| -> Result<BomLine, RepositoryError> {
                let quantity: String =
                    decode_column("quantity_per_yield", line.try_get("quantity_per_yield"))?;
                Ok(BomLine {
                    ingredient_id: IngredientId(decode_column(
                        "ingredient_id",
                        line.try_get("ingredient_id"),
                    )?),
                    quantity_per_yield: parse_decimal("quantity_per_yield", &quantity)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(RecipeBom {
            recipe_id: *recipe_id,
            name,
            yield_quantity: parse_decimal("yield_quantity", &yield_raw)?,
            ingredients,
        }))
    }
}

#[async_trait]
impl RecipeRepository for SqlRecipeRepository {
    async fn find_bom(&self, recipe_id: &RecipeId) -> Result<Option<RecipeBom>, ApplicationError> {
        Ok(self.load_bom(recipe_id).await?)
    }
}
