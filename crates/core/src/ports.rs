//! Collaborator contracts consumed by the planning pipeline.
//!
//! Storage crates implement these; the pipeline only ever sees the traits.

use async_trait::async_trait;

use crate::domain::forecast::{ForecastId, ForecastRecord};
use crate::domain::recipe::{IngredientId, IngredientStock, RecipeBom, RecipeId};
use crate::domain::sales::SalesRecord;
use crate::errors::ApplicationError;

#[async_trait]
pub trait SalesHistoryProvider: Send + Sync {
    /// Sale events for one recipe from the last `days_back` days, in any order.
    async fn get_history(
        &self,
        recipe_id: &RecipeId,
        days_back: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError>;
}

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn find_bom(&self, recipe_id: &RecipeId) -> Result<Option<RecipeBom>, ApplicationError>;
}

#[async_trait]
pub trait IngredientRepository: Send + Sync {
    async fn get_current_stock(
        &self,
        ingredient_id: &IngredientId,
    ) -> Result<Option<IngredientStock>, ApplicationError>;
}

#[async_trait]
pub trait ForecastRepository: Send + Sync {
    async fn create(&self, record: ForecastRecord) -> Result<(), ApplicationError>;

    /// Saved forecasts, most recent first, optionally narrowed to one recipe.
    async fn find_many(
        &self,
        recipe_id: Option<&RecipeId>,
    ) -> Result<Vec<ForecastRecord>, ApplicationError>;

    async fn find_by_id(&self, id: &ForecastId) -> Result<Option<ForecastRecord>, ApplicationError>;
}
