use std::sync::Arc;

use bakeplan_core::config::ConfigOverrides;
use bakeplan_core::domain::forecast::ForecastParams;
use bakeplan_core::domain::recipe::RecipeId;
use bakeplan_core::forecast::{ForecastPlanner, PlannedForecast};
use bakeplan_core::store::ForecastStore;
use bakeplan_db::{SqlForecastRepository, SqlSalesHistoryProvider};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::commands::{open_database, CommandResult, Failure, Invocation};

#[derive(Debug, Clone, Default)]
pub struct ForecastArgs {
    pub recipe: String,
    pub history_days: Option<u32>,
    pub forecast_days: Option<usize>,
    pub window_size: Option<usize>,
    pub save: bool,
    /// Treat the end of this day as "now" when selecting history.
    pub as_of: Option<NaiveDate>,
}

pub fn run(overrides: &ConfigOverrides, args: &ForecastArgs) -> CommandResult {
    let invocation = match Invocation::start("forecast", overrides) {
        Ok(invocation) => invocation,
        Err(result) => return result,
    };

    let result = invocation.block_on(async {
        let recipe_id = RecipeId::parse(&args.recipe)
            .map_err(|error| invocation.application_failure(error.into()))?;
        let defaults = invocation.config.forecast.params();
        let params = ForecastParams {
            history_days: args.history_days.unwrap_or(defaults.history_days),
            forecast_days: args.forecast_days.unwrap_or(defaults.forecast_days),
            window_size: args.window_size.unwrap_or(defaults.window_size),
        };
        params.validate().map_err(|error| invocation.application_failure(error.into()))?;

        let pool = open_database(&invocation.config).await?;
        let mut history = SqlSalesHistoryProvider::new(pool.clone());
        if let Some(as_of) = args.as_of.and_then(|date| date.and_hms_opt(23, 59, 59)) {
            history = history.as_of(as_of.and_utc());
        }
        let planner = ForecastPlanner::new(
            Arc::new(history),
            ForecastStore::new(Arc::new(SqlForecastRepository::new(pool.clone()))),
            invocation.config.forecast.training(),
        );

        let planned = planner.forecast_recipe(recipe_id, &params, args.save).await;
        pool.close().await;
        let planned = planned.map_err(|error| invocation.application_failure(error))?;

        let message = match &planned.record {
            Some(record) => format!(
                "forecast for {} saved as {}",
                planned.result.recipe_name, record.id
            ),
            None => format!("forecast for {} generated", planned.result.recipe_name),
        };
        Ok::<_, Failure>(CommandResult::success_with_data(
            "forecast",
            message,
            Some(render(&planned)),
        ))
    });

    invocation.finish(result)
}

fn render(planned: &PlannedForecast) -> Value {
    let result = &planned.result;
    json!({
        "forecast_id": planned.record.as_ref().map(|record| record.id.to_string()),
        "recipe_id": result.recipe_id.0,
        "recipe_name": result.recipe_name,
        "confidence_level": result.confidence_level,
        "total_quantity": result.total_quantity(),
        "points": result.points(),
        "factors": result.factors,
    })
}
