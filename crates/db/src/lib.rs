pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, ping, DbPool};
pub use fixtures::{DemoBakery, SeedResult, VerificationResult};
pub use repositories::{
    InMemoryForecastRepository, InMemoryIngredientRepository, InMemoryRecipeRepository,
    InMemorySalesHistory, RepositoryError, SqlForecastRepository, SqlIngredientRepository,
    SqlRecipeRepository, SqlSalesHistoryProvider,
};
