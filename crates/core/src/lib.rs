pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod ports;
pub mod requirements;
pub mod store;

#[cfg(test)]
mod testing;

pub use domain::forecast::{ForecastId, ForecastParams, ForecastRecord, ForecastResult};
pub use domain::recipe::{
    BomLine, IngredientId, IngredientRequirement, IngredientStock, RecipeBom, RecipeId,
};
pub use domain::sales::{DailyPoint, DailySeries, SalesRecord, WindowSample};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use forecast::{
    aggregate_daily, build_windows, generate_forecast, predict, train, ForecastPlanner,
    ForecastRequest, PlannedForecast, TrainedModel, TrainingConfig, Trend,
};
pub use ports::{ForecastRepository, IngredientRepository, RecipeRepository, SalesHistoryProvider};
pub use requirements::{
    find_shortages, required_amount, RequirementsCalculator, Shortage, ShortagePolicy,
    StockCoverage,
};
pub use store::ForecastStore;
