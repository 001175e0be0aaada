use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use bakeplan_core::domain::forecast::{ForecastId, ForecastRecord};
use bakeplan_core::domain::recipe::{IngredientId, IngredientStock, RecipeBom, RecipeId};
use bakeplan_core::domain::sales::SalesRecord;
use bakeplan_core::errors::ApplicationError;
use bakeplan_core::ports::{
    ForecastRepository, IngredientRepository, RecipeRepository, SalesHistoryProvider,
};

#[derive(Default)]
pub struct InMemorySalesHistory {
    records: RwLock<Vec<SalesRecord>>,
    as_of: Option<DateTime<Utc>>,
}

impl InMemorySalesHistory {
    pub fn as_of(as_of: DateTime<Utc>) -> Self {
        Self { records: RwLock::default(), as_of: Some(as_of) }
    }

    pub async fn record(&self, record: SalesRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait::async_trait]
impl SalesHistoryProvider for InMemorySalesHistory {
    async fn get_history(
        &self,
        recipe_id: &RecipeId,
        days_back: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        let until = self.as_of.unwrap_or_else(Utc::now);
        let since = until - Duration::days(i64::from(days_back));
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| record.recipe_id == *recipe_id)
            .filter(|record| record.sold_at >= since && record.sold_at <= until)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryRecipeRepository {
    recipes: RwLock<HashMap<RecipeId, RecipeBom>>,
}

impl InMemoryRecipeRepository {
    pub async fn save(&self, bom: RecipeBom) {
        self.recipes.write().await.insert(bom.recipe_id, bom);
    }
}

#[async_trait::async_trait]
impl RecipeRepository for InMemoryRecipeRepository {
    async fn find_bom(&self, recipe_id: &RecipeId) -> Result<Option<RecipeBom>, ApplicationError> {
        let recipes = self.recipes.read().await;
        Ok(recipes.get(recipe_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryIngredientRepository {
    stock: RwLock<HashMap<IngredientId, IngredientStock>>,
}

impl InMemoryIngredientRepository {
    pub async fn save(&self, stock: IngredientStock) {
        self.stock.write().await.insert(stock.ingredient_id, stock);
    }
}

#[async_trait::async_trait]
impl IngredientRepository for InMemoryIngredientRepository {
    async fn get_current_stock(
        &self,
        ingredient_id: &IngredientId,
    ) -> Result<Option<IngredientStock>, ApplicationError> {
        let stock = self.stock.read().await;
        Ok(stock.get(ingredient_id).cloned())
    }
}

/// Keeps insertion order so equal creation times still list newest first.
#[derive(Default)]
pub struct InMemoryForecastRepository {
    forecasts: RwLock<Vec<ForecastRecord>>,
}

#[async_trait::async_trait]
impl ForecastRepository for InMemoryForecastRepository {
    async fn create(&self, record: ForecastRecord) -> Result<(), ApplicationError> {
        let mut forecasts = self.forecasts.write().await;
        if forecasts.iter().any(|existing| existing.id == record.id) {
            return Err(ApplicationError::Persistence(format!(
                "forecast {} already exists",
                record.id
            )));
        }
        forecasts.push(record);
        Ok(())
    }

    async fn find_many(
        &self,
        recipe_id: Option<&RecipeId>,
    ) -> Result<Vec<ForecastRecord>, ApplicationError> {
        let forecasts = self.forecasts.read().await;
        let mut matching: Vec<ForecastRecord> = forecasts
            .iter()
            .rev()
            .filter(|record| recipe_id.map_or(true, |id| record.recipe_id == *id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn find_by_id(&self, id: &ForecastId) -> Result<Option<ForecastRecord>, ApplicationError> {
        let forecasts = self.forecasts.read().await;
        Ok(forecasts.iter().find(|record| record.id == *id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use bakeplan_core::domain::forecast::ForecastParams;
    use bakeplan_core::domain::recipe::{
        BomLine, IngredientId, IngredientStock, RecipeBom, RecipeId,
    };
    use bakeplan_core::domain::sales::SalesRecord;
    use bakeplan_core::errors::{ApplicationError, DomainError};
    use bakeplan_core::forecast::{ForecastPlanner, TrainingConfig};
    use bakeplan_core::ports::SalesHistoryProvider;
    use bakeplan_core::requirements::RequirementsCalculator;
    use bakeplan_core::store::ForecastStore;

    use super::{
        InMemoryForecastRepository, InMemoryIngredientRepository, InMemoryRecipeRepository,
        InMemorySalesHistory,
    };

    fn sale(day: i64, quantity: f64) -> SalesRecord {
        SalesRecord {
            sold_at: Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).single().expect("time")
                + Duration::days(day),
            quantity,
            recipe_id: RecipeId(1),
            recipe_name: "Sourdough".to_string(),
        }
    }

    #[tokio::test]
    async fn sales_history_respects_the_window() {
        let as_of = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).single().expect("time");
        let history = InMemorySalesHistory::as_of(as_of);
        history.record(sale(0, 5.0)).await;
        history.record(sale(25, 6.0)).await;

        let recent = history.get_history(&RecipeId(1), 10).await.expect("history");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].quantity, 6.0);

        let other = history.get_history(&RecipeId(2), 365).await.expect("history");
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn planner_runs_over_in_memory_collaborators() {
        let as_of = Utc.with_ymd_and_hms(2026, 4, 30, 23, 0, 0).single().expect("time");
        let history = InMemorySalesHistory::as_of(as_of);
        for day in 0..56 {
            history.record(sale(day, 30.0 + (day % 7) as f64)).await;
        }
        let forecasts = Arc::new(InMemoryForecastRepository::default());
        let planner = ForecastPlanner::new(
            Arc::new(history),
            ForecastStore::new(forecasts.clone()),
            TrainingConfig::default(),
        );

        let planned = planner
            .forecast_recipe(RecipeId(1), &ForecastParams::default(), true)
            .await
            .expect("forecast");
        let record = planned.record.expect("saved");

        let store = ForecastStore::new(forecasts);
        assert_eq!(store.get(&record.id).await.expect("get"), record);
        assert!(planned.result.predicted_quantities.iter().all(|value| *value >= 0.0));
    }

    #[tokio::test]
    async fn planner_reports_short_history() {
        let as_of = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).single().expect("time");
        let history = InMemorySalesHistory::as_of(as_of);
        for day in 0..5 {
            history.record(sale(day, 10.0)).await;
        }
        let planner = ForecastPlanner::new(
            Arc::new(history),
            ForecastStore::new(Arc::new(InMemoryForecastRepository::default())),
            TrainingConfig::default(),
        );

        let error = planner
            .forecast_recipe(RecipeId(1), &ForecastParams::default(), false)
            .await
            .expect_err("insufficient");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::InsufficientData { required: 14, available: 5 })
        );
    }

    #[tokio::test]
    async fn requirements_run_over_in_memory_catalog() {
        let recipes = InMemoryRecipeRepository::default();
        recipes
            .save(RecipeBom {
                recipe_id: RecipeId(1),
                name: "Sourdough".to_string(),
                yield_quantity: Decimal::from(10),
                ingredients: vec![BomLine {
                    ingredient_id: IngredientId(1),
                    quantity_per_yield: Decimal::from(2),
                }],
            })
            .await;
        let ingredients = InMemoryIngredientRepository::default();
        ingredients
            .save(IngredientStock {
                ingredient_id: IngredientId(1),
                name: "Flour".to_string(),
                unit: "kg".to_string(),
                current_stock: Decimal::from(10),
                category: "dry goods".to_string(),
            })
            .await;

        let calculator = RequirementsCalculator::new(Arc::new(recipes), Arc::new(ingredients));
        let requirements = calculator.calculate(&RecipeId(1), 25.0).await.expect("requirements");

        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].required_amount, Decimal::from(5));
        assert_eq!(requirements[0].current_stock, Decimal::from(10));
    }
}
