use std::sync::Arc;

use bakeplan_core::config::ConfigOverrides;
use bakeplan_core::domain::forecast::ForecastRecord;
use bakeplan_core::domain::recipe::RecipeId;
use bakeplan_core::store::ForecastStore;
use bakeplan_db::SqlForecastRepository;
use serde_json::{json, Value};

use crate::commands::{open_database, CommandResult, Failure, Invocation};

/// Lists saved forecasts, most recent first.
pub fn run(overrides: &ConfigOverrides, recipe: Option<&str>) -> CommandResult {
    let invocation = match Invocation::start("forecasts", overrides) {
        Ok(invocation) => invocation,
        Err(result) => return result,
    };

    let result = invocation.block_on(async {
        let recipe_id = recipe
            .map(RecipeId::parse)
            .transpose()
            .map_err(|error| invocation.application_failure(error.into()))?;

        let pool = open_database(&invocation.config).await?;
        let store = ForecastStore::new(Arc::new(SqlForecastRepository::new(pool.clone())));
        let records = store.list(recipe_id.as_ref()).await;
        pool.close().await;
        let records = records.map_err(|error| invocation.application_failure(error))?;

        let summaries: Vec<Value> = records.iter().map(summarize).collect();
        Ok::<_, Failure>(CommandResult::success_with_data(
            "forecasts",
            format!("{} saved forecast(s)", summaries.len()),
            Some(json!({ "forecasts": summaries })),
        ))
    });

    invocation.finish(result)
}

fn summarize(record: &ForecastRecord) -> Value {
    json!({
        "id": record.id.to_string(),
        "recipe_id": record.recipe_id.0,
        "recipe_name": record.recipe_name,
        "start_date": record.start_date.to_string(),
        "end_date": record.end_date.to_string(),
        "created_at": record.created_at.to_rfc3339(),
        "confidence_level": record.confidence_level,
        "total_quantity": record.predicted_quantities.iter().sum::<f64>(),
    })
}
