//! Demand forecasting pipeline: aggregate, window, train, predict.

pub mod aggregate;
pub mod model;
pub mod window;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::forecast::{
    validate_forecast_days, validate_window_size, ForecastParams, ForecastRecord, ForecastResult,
};
use crate::domain::recipe::RecipeId;
use crate::domain::sales::DailySeries;
use crate::errors::{ApplicationError, DomainError};
use crate::ports::SalesHistoryProvider;
use crate::store::ForecastStore;

pub use aggregate::aggregate_daily;
pub use model::{confidence_from_loss, predict, train, TrainedModel, TrainingConfig};
pub use window::build_windows;

/// Relative change between the recent window and the forecast that still counts as flat.
const TREND_TOLERANCE: f64 = 0.05;

#[derive(Clone, Debug, PartialEq)]
pub struct ForecastRequest {
    pub recipe_id: RecipeId,
    pub recipe_name: String,
    pub series: DailySeries,
    pub window_size: usize,
    pub forecast_days: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Flat => "flat",
        }
    }

    fn between(recent_mean: f64, forecast_mean: f64) -> Self {
        if recent_mean.abs() < f64::EPSILON {
            return if forecast_mean > f64::EPSILON { Self::Rising } else { Self::Flat };
        }
        let ratio = forecast_mean / recent_mean;
        if ratio > 1.0 + TREND_TOLERANCE {
            Self::Rising
        } else if ratio < 1.0 - TREND_TOLERANCE {
            Self::Falling
        } else {
            Self::Flat
        }
    }
}

/// Trains a fresh model on `request.series` and projects `forecast_days` beyond its last date.
///
/// Refuses with `InsufficientData` before any featurization when fewer than
/// `2 * window_size` days were observed.
pub fn generate_forecast(
    request: &ForecastRequest,
    training: &TrainingConfig,
) -> Result<ForecastResult, DomainError> {
    validate_window_size(request.window_size)?;
    validate_forecast_days(request.forecast_days)?;

    let required = request.window_size * 2;
    let available = request.series.len();
    let Some(last_date) = request.series.last_date().filter(|_| available >= required) else {
        return Err(DomainError::InsufficientData { required, available });
    };

    let samples = build_windows(&request.series, request.window_size)?;
    let model = train(&samples, training)?;

    let quantities = request.series.quantities();
    let last_window = &quantities[quantities.len() - request.window_size..];
    let predicted_quantities = predict(&model, last_window, request.forecast_days)?;

    let dates = (1..=request.forecast_days)
        .map(|offset| last_date + Duration::days(offset as i64))
        .collect::<Vec<_>>();
    let confidence_level = confidence_from_loss(model.final_loss());

    let recent_mean = mean(last_window);
    let forecast_mean = mean(&predicted_quantities);
    let trend = Trend::between(recent_mean, forecast_mean);

    let mut factors: BTreeMap<String, Value> = BTreeMap::new();
    factors.insert("window_size".to_string(), json!(request.window_size));
    factors.insert("history_days_observed".to_string(), json!(available));
    factors.insert("training_samples".to_string(), json!(model.training_samples()));
    factors.insert("epochs".to_string(), json!(model.epochs()));
    factors.insert("final_loss".to_string(), json!(model.final_loss()));
    factors.insert("lag_weights".to_string(), json!(model.weights()));
    factors.insert("average_daily_quantity".to_string(), json!(mean(&quantities)));
    factors.insert("last_observed_date".to_string(), json!(last_date.to_string()));
    factors.insert("trend".to_string(), json!(trend.as_str()));

    info!(
        event_name = "forecast.generate.completed",
        recipe_id = request.recipe_id.0,
        history_days_observed = available,
        forecast_days = request.forecast_days,
        confidence_level,
        trend = trend.as_str(),
        "forecast generated"
    );

    Ok(ForecastResult {
        recipe_id: request.recipe_id,
        recipe_name: request.recipe_name.clone(),
        dates,
        predicted_quantities,
        confidence_level,
        factors,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedForecast {
    pub result: ForecastResult,
    pub record: Option<ForecastRecord>,
}

/// Runs the whole pipeline for one recipe against the sales history collaborator.
pub struct ForecastPlanner {
    history: Arc<dyn SalesHistoryProvider>,
    store: ForecastStore,
    training: TrainingConfig,
}

impl ForecastPlanner {
    pub fn new(
        history: Arc<dyn SalesHistoryProvider>,
        store: ForecastStore,
        training: TrainingConfig,
    ) -> Self {
        Self { history, store, training }
    }

    /// Fetch, aggregate, fit and predict; optionally persist the outcome.
    ///
    /// Training runs on the blocking pool so it never stalls the async scheduler.
    pub async fn forecast_recipe(
        &self,
        recipe_id: RecipeId,
        params: &ForecastParams,
        persist: bool,
    ) -> Result<PlannedForecast, ApplicationError> {
        params.validate()?;
        self.training
            .validate()
            .map_err(|error| {
                ApplicationError::Configuration(format!("training settings: {error}"))
            })?;

        let records = self.history.get_history(&recipe_id, params.history_days).await?;
        let series = aggregate_daily(&records);
        if series.len() < params.minimum_history() {
            warn!(
                event_name = "forecast.generate.insufficient_history",
                recipe_id = recipe_id.0,
                available = series.len(),
                required = params.minimum_history(),
                "not enough sales history to forecast"
            );
            return Err(DomainError::InsufficientData {
                required: params.minimum_history(),
                available: series.len(),
            }
            .into());
        }

        let recipe_name = records
            .first()
            .map(|record| record.recipe_name.clone())
            .unwrap_or_else(|| recipe_id.to_string());
        let request = ForecastRequest {
            recipe_id,
            recipe_name,
            series,
            window_size: params.window_size,
            forecast_days: params.forecast_days,
        };
        let training = self.training;

        let result = tokio::task::spawn_blocking(move || generate_forecast(&request, &training))
            .await
            .map_err(|error| {
                ApplicationError::from(DomainError::Computation(format!(
                    "forecast worker failed: {error}"
                )))
            })??;

        let record = if persist {
            let (Some(start_date), Some(end_date)) =
                (result.dates.first().copied(), result.dates.last().copied())
            else {
                return Err(DomainError::Computation("forecast horizon is empty".to_string()).into());
            };
            Some(self.store.save(&result, start_date, end_date).await?)
        } else {
            None
        };

        Ok(PlannedForecast { result, record })
    }
}
