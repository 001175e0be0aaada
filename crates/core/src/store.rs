use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::forecast::{ForecastId, ForecastRecord, ForecastResult};
use crate::domain::recipe::RecipeId;
use crate::errors::{ApplicationError, DomainError};
use crate::ports::ForecastRepository;

/// Write-once persistence facade for generated forecasts.
#[derive(Clone)]
pub struct ForecastStore {
    repository: Arc<dyn ForecastRepository>,
}

impl ForecastStore {
    pub fn new(repository: Arc<dyn ForecastRepository>) -> Self {
        Self { repository }
    }

    /// Assigns a fresh id and creation time, then stores the record in a single write.
    pub async fn save(
        &self,
        result: &ForecastResult,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<ForecastRecord, ApplicationError> {
        if start_date > end_date {
            return Err(DomainError::invalid("start_date", "must not be after end_date").into());
        }
        if result.dates.len() != result.predicted_quantities.len() {
            return Err(DomainError::invalid(
                "predicted_quantities",
                "must have one value per forecast date",
            )
            .into());
        }

        let record = ForecastRecord {
            id: ForecastId(Uuid::new_v4().to_string()),
            recipe_id: result.recipe_id,
            recipe_name: result.recipe_name.clone(),
            start_date,
            end_date,
            created_at: Utc::now(),
            dates: result.dates.clone(),
            predicted_quantities: result.predicted_quantities.clone(),
            confidence_level: result.confidence_level,
            factors: result.factors.clone(),
            time_series_data: result.points(),
        };

        self.repository.create(record.clone()).await?;
        info!(
            event_name = "forecast.store.saved",
            forecast_id = %record.id,
            recipe_id = record.recipe_id.0,
            "forecast persisted"
        );

        Ok(record)
    }

    pub async fn list(
        &self,
        recipe_id: Option<&RecipeId>,
    ) -> Result<Vec<ForecastRecord>, ApplicationError> {
        self.repository.find_many(recipe_id).await
    }

    pub async fn get(&self, id: &ForecastId) -> Result<ForecastRecord, ApplicationError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::ForecastNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use serde_json::json;

    use super::ForecastStore;
    use crate::domain::forecast::{ForecastId, ForecastResult};
    use crate::domain::recipe::RecipeId;
    use crate::errors::{ApplicationError, DomainError};
    use crate::testing::FakeForecastRepository;

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).expect("valid date")
    }

    fn result(recipe_id: i64) -> ForecastResult {
        ForecastResult {
            recipe_id: RecipeId(recipe_id),
            recipe_name: format!("Recipe {recipe_id}"),
            dates: vec![day(1), day(2), day(3)],
            predicted_quantities: vec![12.5, 13.25, 0.0],
            confidence_level: 0.82,
            factors: BTreeMap::from([("trend".to_string(), json!("rising"))]),
        }
    }

    #[tokio::test]
    async fn saved_forecast_round_trips_by_id() {
        let store = ForecastStore::new(Arc::new(FakeForecastRepository::default()));
        let saved = store.save(&result(1), day(1), day(3)).await.expect("save");

        let loaded = store.get(&saved.id).await.expect("get");
        assert_eq!(loaded.dates, vec![day(1), day(2), day(3)]);
        assert_eq!(loaded.predicted_quantities, vec![12.5, 13.25, 0.0]);
        assert_eq!(loaded.confidence_level, 0.82);
        assert_eq!(loaded.time_series_data.len(), 3);
        assert_eq!(loaded.time_series_data[1].quantity, 13.25);
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn every_save_gets_a_fresh_identifier() {
        let store = ForecastStore::new(Arc::new(FakeForecastRepository::default()));
        let first = store.save(&result(1), day(1), day(3)).await.expect("save");
        let second = store.save(&result(1), day(1), day(3)).await.expect("save");

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn list_filters_by_recipe_and_returns_newest_first() {
        let store = ForecastStore::new(Arc::new(FakeForecastRepository::default()));
        let older = store.save(&result(1), day(1), day(3)).await.expect("save");
        let other = store.save(&result(2), day(1), day(3)).await.expect("save");
        let newer = store.save(&result(1), day(1), day(3)).await.expect("save");

        let all = store.list(None).await.expect("list");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, newer.id);

        let only_first = store.list(Some(&RecipeId(1))).await.expect("list");
        let ids: Vec<_> = only_first.iter().map(|record| record.id.clone()).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert!(!ids.contains(&other.id));
    }

    #[tokio::test]
    async fn missing_forecast_is_not_found() {
        let store = ForecastStore::new(Arc::new(FakeForecastRepository::default()));
        let error = store.get(&ForecastId("missing".to_string())).await.expect_err("absent");

        assert_eq!(error, ApplicationError::ForecastNotFound(ForecastId("missing".to_string())));
    }

    #[tokio::test]
    async fn inverted_date_range_is_rejected_without_writing() {
        let repository = Arc::new(FakeForecastRepository::default());
        let store = ForecastStore::new(repository.clone());
        let error = store.save(&result(1), day(3), day(1)).await.expect_err("inverted range");

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::InvalidInput { field: "start_date", .. })
        ));
        assert_eq!(repository.len().await, 0);
    }
}
