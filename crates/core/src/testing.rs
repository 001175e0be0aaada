//! In-crate fakes for the collaborator ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::forecast::{ForecastId, ForecastRecord};
use crate::domain::recipe::{IngredientId, IngredientStock, RecipeBom, RecipeId};
use crate::domain::sales::SalesRecord;
use crate::errors::ApplicationError;
use crate::ports::{
    ForecastRepository, IngredientRepository, RecipeRepository, SalesHistoryProvider,
};

#[derive(Default)]
pub struct FakeForecastRepository {
    records: RwLock<Vec<ForecastRecord>>,
}

impl FakeForecastRepository {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ForecastRepository for FakeForecastRepository {
    async fn create(&self, record: ForecastRecord) -> Result<(), ApplicationError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn find_many(
        &self,
        recipe_id: Option<&RecipeId>,
    ) -> Result<Vec<ForecastRecord>, ApplicationError> {
        let records = self.records.read().await;
        let mut matching: Vec<ForecastRecord> = records
            .iter()
            .rev()
            .filter(|record| recipe_id.map_or(true, |id| record.recipe_id == *id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn find_by_id(&self, id: &ForecastId) -> Result<Option<ForecastRecord>, ApplicationError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.id == *id).cloned())
    }
}

pub struct FakeSalesHistory {
    records: Vec<SalesRecord>,
    failure: Option<String>,
}

impl FakeSalesHistory {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        Self { records, failure: None }
    }

    pub fn failing(message: &str) -> Self {
        Self { records: Vec::new(), failure: Some(message.to_string()) }
    }
}

#[async_trait]
impl SalesHistoryProvider for FakeSalesHistory {
    async fn get_history(
        &self,
        recipe_id: &RecipeId,
        _days_back: u32,
    ) -> Result<Vec<SalesRecord>, ApplicationError> {
        if let Some(message) = &self.failure {
            return Err(ApplicationError::Persistence(message.clone()));
        }
        Ok(self.records.iter().filter(|record| record.recipe_id == *recipe_id).cloned().collect())
    }
}

/// Recipe and ingredient fake that counts every lookup.
#[derive(Default)]
pub struct FakeCatalog {
    recipes: HashMap<RecipeId, RecipeBom>,
    stock: HashMap<IngredientId, IngredientStock>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_recipe(mut self, bom: RecipeBom) -> Self {
        self.recipes.insert(bom.recipe_id, bom);
        self
    }

    pub fn with_stock(mut self, stock: IngredientStock) -> Self {
        self.stock.insert(stock.ingredient_id, stock);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeRepository for FakeCatalog {
    async fn find_bom(&self, recipe_id: &RecipeId) -> Result<Option<RecipeBom>, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.recipes.get(recipe_id).cloned())
    }
}

#[async_trait]
impl IngredientRepository for FakeCatalog {
    async fn get_current_stock(
        &self,
        ingredient_id: &IngredientId,
    ) -> Result<Option<IngredientStock>, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.stock.get(ingredient_id).cloned())
    }
}
