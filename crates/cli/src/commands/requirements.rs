use std::sync::Arc;

use bakeplan_core::config::ConfigOverrides;
use bakeplan_core::domain::forecast::ForecastId;
use bakeplan_core::domain::recipe::{IngredientRequirement, RecipeId};
use bakeplan_core::errors::{ApplicationError, DomainError};
use bakeplan_core::requirements::{find_shortages, RequirementsCalculator, StockCoverage};
use bakeplan_core::store::ForecastStore;
use bakeplan_db::{DbPool, SqlForecastRepository, SqlIngredientRepository, SqlRecipeRepository};
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::{open_database, CommandResult, Failure, Invocation};

/// Where the production quantity comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantitySource {
    Explicit(f64),
    /// Total predicted quantity of a saved forecast.
    SavedForecast(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementsArgs {
    pub recipe: String,
    pub quantity: QuantitySource,
    pub safety_margin: Option<Decimal>,
}

pub fn run(overrides: &ConfigOverrides, args: &RequirementsArgs) -> CommandResult {
    let invocation = match Invocation::start("requirements", overrides) {
        Ok(invocation) => invocation,
        Err(result) => return result,
    };

    let result = invocation.block_on(async {
        let recipe_id = RecipeId::parse(&args.recipe)
            .map_err(|error| invocation.application_failure(error.into()))?;
        let policy = StockCoverage { safety_margin: args.safety_margin.unwrap_or_default() };
        if policy.safety_margin < Decimal::ZERO {
            return Err(invocation.application_failure(
                DomainError::invalid("safety_margin", "must not be negative").into(),
            ));
        }

        let pool = open_database(&invocation.config).await?;
        let outcome = calculate(&pool, &recipe_id, &args.quantity).await;
        pool.close().await;
        let (quantity, requirements) =
            outcome.map_err(|error| invocation.application_failure(error))?;

        let shortages = find_shortages(&requirements, &policy);
        let message = format!(
            "{} ingredient(s) needed for {quantity} unit(s), {} short",
            requirements.len(),
            shortages.len()
        );
        Ok::<_, Failure>(CommandResult::success_with_data(
            "requirements",
            message,
            Some(json!({
                "recipe_id": recipe_id.0,
                "forecast_quantity": quantity,
                "safety_margin": policy.safety_margin,
                "requirements": requirements,
                "shortages": shortages,
            })),
        ))
    });

    invocation.finish(result)
}

async fn calculate(
    pool: &DbPool,
    recipe_id: &RecipeId,
    source: &QuantitySource,
) -> Result<(f64, Vec<IngredientRequirement>), ApplicationError> {
    let quantity = match source {
        QuantitySource::Explicit(quantity) => *quantity,
        QuantitySource::SavedForecast(id) => {
            let store = ForecastStore::new(Arc::new(SqlForecastRepository::new(pool.clone())));
            let record = store.get(&ForecastId(id.clone())).await?;
            if record.recipe_id != *recipe_id {
                return Err(DomainError::invalid(
                    "forecast_id",
                    format!("forecast {id} belongs to recipe {}", record.recipe_id),
                )
                .into());
            }
            record.predicted_quantities.iter().sum()
        }
    };

    let calculator = RequirementsCalculator::new(
        Arc::new(SqlRecipeRepository::new(pool.clone())),
        Arc::new(SqlIngredientRepository::new(pool.clone())),
    );
    let requirements = calculator.calculate(recipe_id, quantity).await?;
    Ok((quantity, requirements))
}
