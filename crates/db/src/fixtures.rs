use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{format_timestamp, RepositoryError};

const SEED_CREATED_AT: &str = "2026-01-01T00:00:00.000000Z";

struct SeedIngredient {
    id: i64,
    name: &'static str,
    unit: &'static str,
    current_stock: &'static str,
    category: &'static str,
}

struct SeedRecipe {
    id: i64,
    name: &'static str,
    yield_quantity: &'static str,
    /// `(ingredient_id, quantity_per_yield)` in BOM order.
    lines: &'static [(i64, &'static str)],
}

const INGREDIENTS: &[SeedIngredient] = &[
    SeedIngredient { id: 1, name: "Bread flour", unit: "kg", current_stock: "25", category: "flour" },
    SeedIngredient { id: 2, name: "Water", unit: "l", current_stock: "200", category: "liquids" },
    SeedIngredient { id: 3, name: "Sea salt", unit: "kg", current_stock: "0.4", category: "dry goods" },
    SeedIngredient { id: 4, name: "Levain", unit: "kg", current_stock: "3", category: "cultures" },
    SeedIngredient { id: 5, name: "Butter", unit: "kg", current_stock: "4.5", category: "dairy" },
    SeedIngredient { id: 6, name: "Caster sugar", unit: "kg", current_stock: "6", category: "dry goods" },
    SeedIngredient { id: 7, name: "Instant yeast", unit: "kg", current_stock: "0.25", category: "cultures" },
];

const RECIPES: &[SeedRecipe] = &[
    SeedRecipe {
        id: 1,
        name: "Country sourdough",
        yield_quantity: "10",
        lines: &[(1, "5"), (2, "3.6"), (3, "0.1"), (4, "1")],
    },
    SeedRecipe {
        id: 2,
        name: "Butter croissant",
        yield_quantity: "12",
        lines: &[(1, "1.25"), (5, "0.5"), (6, "0.15"), (7, "0.333"), (2, "0.55")],
    },
];

/// Deterministic demo bakery: two recipes with BOMs and daily sourdough sales.
pub struct DemoBakery;

impl DemoBakery {
    pub const SOURDOUGH_RECIPE_ID: i64 = 1;
    pub const CROISSANT_RECIPE_ID: i64 = 2;
    pub const SALES_DAYS: i64 = 120;

    /// Last day with recorded sales.
    pub fn anchor_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap_or(NaiveDate::MIN)
    }

    /// End of the anchor day, for pinning history windows to the seeded data.
    pub fn as_of() -> DateTime<Utc> {
        Self::anchor_date()
            .and_hms_opt(23, 59, 59)
            .map(|value| value.and_utc())
            .unwrap_or_else(Utc::now)
    }

    /// Loads the demo data; running it again leaves the database unchanged.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for ingredient in INGREDIENTS {
            sqlx::query(
                "INSERT OR IGNORE INTO ingredient (id, name, unit, current_stock, category, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(ingredient.id)
            .bind(ingredient.name)
            .bind(ingredient.unit)
            .bind(ingredient.current_stock)
            .bind(ingredient.category)
            .bind(SEED_CREATED_AT)
            .execute(&mut *tx)
            .await?;
        }

        for recipe in RECIPES {
            sqlx::query(
                "INSERT OR IGNORE INTO recipe (id, name, yield_quantity, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(recipe.id)
            .bind(recipe.name)
            .bind(recipe.yield_quantity)
            .bind(SEED_CREATED_AT)
            .execute(&mut *tx)
            .await?;

            for (position, (ingredient_id, quantity)) in recipe.lines.iter().enumerate() {
                sqlx::query(
                    "INSERT OR IGNORE INTO recipe_ingredient
                         (recipe_id, ingredient_id, position, quantity_per_yield)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(recipe.id)
                .bind(ingredient_id)
                .bind(position as i64)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        let events = sourdough_sales();
        for (event_id, (sold_at, quantity)) in events.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO sales_event (id, recipe_id, sold_at, quantity)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(event_id as i64 + 1)
            .bind(Self::SOURDOUGH_RECIPE_ID)
            .bind(format_timestamp(*sold_at))
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            event_name = "fixtures.demo_bakery.loaded",
            recipes = RECIPES.len(),
            ingredients = INGREDIENTS.len(),
            sales_events = events.len(),
            "demo bakery loaded"
        );

        Ok(SeedResult {
            recipes: RECIPES.iter().map(|recipe| recipe.name).collect(),
            ingredients: INGREDIENTS.len(),
            sales_events: events.len(),
            anchor_date: Self::anchor_date(),
        })
    }

    /// Checks that every seeded row is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for recipe in RECIPES {
            let present: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipe WHERE id = ?1)")
                .bind(recipe.id)
                .fetch_one(pool)
                .await?;
            checks.push((recipe.name, present == 1));

            let lines: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM recipe_ingredient WHERE recipe_id = ?1")
                    .bind(recipe.id)
                    .fetch_one(pool)
                    .await?;
            checks.push(("bom-lines", lines == recipe.lines.len() as i64));
        }

        let ingredients: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM ingredient WHERE id <= ?1")
            .bind(INGREDIENTS.len() as i64)
            .fetch_one(pool)
            .await?;
        checks.push(("ingredients", ingredients == INGREDIENTS.len() as i64));

        let sales: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM sales_event WHERE recipe_id = ?1 AND id <= ?2")
                .bind(Self::SOURDOUGH_RECIPE_ID)
                .bind(expected_sales_events())
                .fetch_one(pool)
                .await?;
        checks.push(("sourdough-sales", sales == expected_sales_events()));

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

fn expected_sales_events() -> i64 {
    DemoBakery::SALES_DAYS * 2
}

/// Two sales per day: a morning rush and an afternoon top-up, with a weekend lift.
fn sourdough_sales() -> Vec<(DateTime<Utc>, f64)> {
    const WEEKLY_LIFT: [f64; 7] = [0.0, 2.0, 3.0, 4.0, 8.0, 14.0, 10.0];

    let first_day = DemoBakery::anchor_date() - Duration::days(DemoBakery::SALES_DAYS - 1);
    (0..DemoBakery::SALES_DAYS)
        .flat_map(|offset| {
            let date = first_day + Duration::days(offset);
            let morning = date.and_hms_opt(8, 15, 0).map(|value| value.and_utc());
            let afternoon = date.and_hms_opt(15, 40, 0).map(|value| value.and_utc());
            let lift = WEEKLY_LIFT[(offset % 7) as usize];
            let drift = (offset / 30) as f64;
            [
                morning.map(|at| (at, 24.0 + lift + drift)),
                afternoon.map(|at| (at, 12.0 + (offset % 3) as f64)),
            ]
        })
        .flatten()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub recipes: Vec<&'static str>,
    pub ingredients: usize,
    pub sales_events: usize,
    pub anchor_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bakeplan_core::domain::forecast::ForecastParams;
    use bakeplan_core::domain::recipe::RecipeId;
    use bakeplan_core::forecast::{ForecastPlanner, TrainingConfig};
    use bakeplan_core::ports::RecipeRepository;
    use bakeplan_core::requirements::{find_shortages, RequirementsCalculator, StockCoverage};
    use bakeplan_core::store::ForecastStore;

    use super::DemoBakery;
    use crate::repositories::test_support::setup;
    use crate::repositories::{
        SqlForecastRepository, SqlIngredientRepository, SqlRecipeRepository,
        SqlSalesHistoryProvider,
    };

    #[tokio::test]
    async fn load_is_idempotent_and_verifiable() {
        let pool = setup().await;

        let first = DemoBakery::load(&pool).await.expect("first load");
        let second = DemoBakery::load(&pool).await.expect("second load");
        assert_eq!(first, second);
        assert_eq!(first.sales_events, 240);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM sales_event")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 240);

        let verification = DemoBakery::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "{:?}", verification.checks);
    }

    #[tokio::test]
    async fn verify_reports_missing_data_on_an_empty_database() {
        let pool = setup().await;
        let verification = DemoBakery::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
    }

    #[tokio::test]
    async fn seeded_bakery_supports_the_full_pipeline() {
        let pool = setup().await;
        DemoBakery::load(&pool).await.expect("load");

        let planner = ForecastPlanner::new(
            Arc::new(SqlSalesHistoryProvider::new(pool.clone()).as_of(DemoBakery::as_of())),
            ForecastStore::new(Arc::new(SqlForecastRepository::new(pool.clone()))),
            TrainingConfig::default(),
        );
        let planned = planner
            .forecast_recipe(RecipeId(DemoBakery::SOURDOUGH_RECIPE_ID), &ForecastParams::default(), true)
            .await
            .expect("forecast");

        assert_eq!(planned.result.recipe_name, "Country sourdough");
        assert_eq!(planned.result.factors["history_days_observed"], 120);
        assert_eq!(
            planned.result.dates[0],
            DemoBakery::anchor_date() + chrono::Duration::days(1)
        );
        assert!(planned.record.is_some());

        let bom = SqlRecipeRepository::new(pool.clone())
            .find_bom(&RecipeId(DemoBakery::SOURDOUGH_RECIPE_ID))
            .await
            .expect("bom")
            .expect("present");
        assert_eq!(bom.ingredients.len(), 4);

        let calculator = RequirementsCalculator::new(
            Arc::new(SqlRecipeRepository::new(pool.clone())),
            Arc::new(SqlIngredientRepository::new(pool)),
        );
        let requirements = calculator
            .calculate(&RecipeId(DemoBakery::SOURDOUGH_RECIPE_ID), 60.0)
            .await
            .expect("requirements");
        let names: Vec<&str> = requirements.iter().map(|line| line.name.as_str()).collect();
        assert_eq!(names, vec!["Bread flour", "Water", "Sea salt", "Levain"]);

        let shortages = find_shortages(&requirements, &StockCoverage::default());
        let short: Vec<&str> = shortages.iter().map(|line| line.name.as_str()).collect();
        assert_eq!(short, vec!["Bread flour", "Sea salt", "Levain"]);
    }
}
