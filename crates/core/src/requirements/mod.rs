//! Ingredient requirements for a forecast quantity, and shortage detection over them.
//!
//! The two stages are independent: [`RequirementsCalculator`] only puts required
//! amounts next to current stock, and a [`ShortagePolicy`] decides what counts as short.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::recipe::{IngredientId, IngredientRequirement, RecipeId};
use crate::errors::{ApplicationError, DomainError};
use crate::ports::{IngredientRepository, RecipeRepository};

/// `quantity_per_yield * forecast_quantity / yield_quantity`, rounded half away from zero to 2 places.
pub fn required_amount(
    quantity_per_yield: Decimal,
    forecast_quantity: Decimal,
    yield_quantity: Decimal,
) -> Result<Decimal, DomainError> {
    if yield_quantity.is_zero() {
        return Err(DomainError::invalid("yield_quantity", "recipe yield must be non-zero"));
    }
    quantity_per_yield
        .checked_mul(forecast_quantity)
        .and_then(|scaled| scaled.checked_div(yield_quantity))
        .map(|amount| amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| DomainError::Computation("required amount overflowed".to_string()))
}

fn parse_forecast_quantity(forecast_quantity: f64) -> Result<Decimal, DomainError> {
    if !forecast_quantity.is_finite() || forecast_quantity <= 0.0 {
        return Err(DomainError::invalid(
            "forecast_quantity",
            "must be a positive finite number",
        ));
    }
    Decimal::from_f64(forecast_quantity)
        .ok_or_else(|| DomainError::invalid("forecast_quantity", "is out of range"))
}

pub struct RequirementsCalculator {
    recipes: Arc<dyn RecipeRepository>,
    ingredients: Arc<dyn IngredientRepository>,
}

impl RequirementsCalculator {
    pub fn new(recipes: Arc<dyn RecipeRepository>, ingredients: Arc<dyn IngredientRepository>) -> Self {
        Self { recipes, ingredients }
    }

    /// One requirement per bill-of-materials line, in BOM order.
    ///
    /// The quantity is validated before any collaborator is consulted.
    pub async fn calculate(
        &self,
        recipe_id: &RecipeId,
        forecast_quantity: f64,
    ) -> Result<Vec<IngredientRequirement>, ApplicationError> {
        let quantity = parse_forecast_quantity(forecast_quantity)?;

        let bom = self
            .recipes
            .find_bom(recipe_id)
            .await?
            .ok_or(ApplicationError::RecipeNotFound(*recipe_id))?;
        if bom.yield_quantity <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "yield_quantity",
                format!("recipe {recipe_id} has a non-positive yield"),
            )
            .into());
        }

        let mut requirements = Vec::with_capacity(bom.ingredients.len());
        for line in &bom.ingredients {
            let stock = self
                .ingredients
                .get_current_stock(&line.ingredient_id)
                .await?
                .ok_or_else(|| {
                    ApplicationError::Persistence(format!(
                        "ingredient {} referenced by recipe {recipe_id} is missing",
                        line.ingredient_id
                    ))
                })?;

            requirements.push(IngredientRequirement {
                ingredient_id: line.ingredient_id,
                name: stock.name,
                unit: stock.unit,
                required_amount: required_amount(
                    line.quantity_per_yield,
                    quantity,
                    bom.yield_quantity,
                )?,
                current_stock: stock.current_stock,
                category: stock.category,
            });
        }

        info!(
            event_name = "requirements.calculated",
            recipe_id = recipe_id.0,
            forecast_quantity,
            lines = requirements.len(),
            "ingredient requirements calculated"
        );

        Ok(requirements)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub unit: String,
    pub required_amount: Decimal,
    pub current_stock: Decimal,
    pub deficit: Decimal,
}

/// Decides whether a requirement is short, and by how much.
pub trait ShortagePolicy: Send + Sync {
    fn deficit(&self, requirement: &IngredientRequirement) -> Option<Decimal>;
}

impl<F> ShortagePolicy for F
where
    F: Fn(&IngredientRequirement) -> Option<Decimal> + Send + Sync,
{
    fn deficit(&self, requirement: &IngredientRequirement) -> Option<Decimal> {
        self(requirement)
    }
}

/// Short when stock does not cover the requirement plus a fractional safety margin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCoverage {
    /// `0.10` asks for 10% more than the requirement to be on hand.
    pub safety_margin: Decimal,
}

impl ShortagePolicy for StockCoverage {
    fn deficit(&self, requirement: &IngredientRequirement) -> Option<Decimal> {
        let needed = requirement.required_amount * (Decimal::ONE + self.safety_margin);
        let deficit = (needed - requirement.current_stock)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        (deficit > Decimal::ZERO).then_some(deficit)
    }
}

pub fn find_shortages(
    requirements: &[IngredientRequirement],
    policy: &dyn ShortagePolicy,
) -> Vec<Shortage> {
    requirements
        .iter()
        .filter_map(|requirement| {
            policy.deficit(requirement).map(|deficit| Shortage {
                ingredient_id: requirement.ingredient_id,
                name: requirement.name.clone(),
                unit: requirement.unit.clone(),
                required_amount: requirement.required_amount,
                current_stock: requirement.current_stock,
                deficit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::{find_shortages, required_amount, RequirementsCalculator, StockCoverage};
    use crate::domain::recipe::{
        BomLine, IngredientId, IngredientRequirement, IngredientStock, RecipeBom, RecipeId,
    };
    use crate::errors::{ApplicationError, DomainError};
    use crate::testing::FakeCatalog;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).expect("decimal literal")
    }

    fn stock(id: i64, name: &str, unit: &str, on_hand: &str, category: &str) -> IngredientStock {
        IngredientStock {
            ingredient_id: IngredientId(id),
            name: name.to_string(),
            unit: unit.to_string(),
            current_stock: dec(on_hand),
            category: category.to_string(),
        }
    }

    fn catalog() -> FakeCatalog {
        FakeCatalog::default()
            .with_recipe(RecipeBom {
                recipe_id: RecipeId(1),
                name: "Country loaf".to_string(),
                yield_quantity: dec("10"),
                ingredients: vec![BomLine {
                    ingredient_id: IngredientId(1),
                    quantity_per_yield: dec("2"),
                }],
            })
            .with_recipe(RecipeBom {
                recipe_id: RecipeId(2),
                name: "Brioche".to_string(),
                yield_quantity: dec("12"),
                ingredients: vec![
                    BomLine { ingredient_id: IngredientId(3), quantity_per_yield: dec("0.5") },
                    BomLine { ingredient_id: IngredientId(1), quantity_per_yield: dec("1.25") },
                    BomLine { ingredient_id: IngredientId(2), quantity_per_yield: dec("0.333") },
                ],
            })
            .with_recipe(RecipeBom {
                recipe_id: RecipeId(9),
                name: "Broken".to_string(),
                yield_quantity: Decimal::ZERO,
                ingredients: vec![BomLine {
                    ingredient_id: IngredientId(1),
                    quantity_per_yield: dec("1"),
                }],
            })
            .with_stock(stock(1, "flour", "kg", "40", "dry goods"))
            .with_stock(stock(2, "yeast", "kg", "0.1", "leavening"))
            .with_stock(stock(3, "butter", "kg", "3", "dairy"))
    }

    fn calculator(catalog: Arc<FakeCatalog>) -> RequirementsCalculator {
        RequirementsCalculator::new(catalog.clone(), catalog)
    }

    #[tokio::test]
    async fn flour_for_twenty_five_units_of_a_yield_ten_recipe() {
        let requirements =
            calculator(Arc::new(catalog())).calculate(&RecipeId(1), 25.0).await.expect("calculate");

        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].name, "flour");
        assert_eq!(requirements[0].required_amount, dec("5.00"));
        assert_eq!(requirements[0].current_stock, dec("40"));
        assert_eq!(requirements[0].category, "dry goods");
    }

    #[tokio::test]
    async fn lines_keep_bom_order_and_carry_stock() {
        let requirements =
            calculator(Arc::new(catalog())).calculate(&RecipeId(2), 30.0).await.expect("calculate");

        let names: Vec<_> = requirements.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["butter", "flour", "yeast"]);
        assert_eq!(requirements[0].required_amount, dec("1.25"));
        assert_eq!(requirements[1].required_amount, dec("3.13"));
        assert_eq!(requirements[2].required_amount, dec("0.83"));
        assert_eq!(requirements[2].unit, "kg");
    }

    #[tokio::test]
    async fn requirements_scale_linearly_with_quantity() {
        let calculator = calculator(Arc::new(catalog()));
        for quantity in [1.0, 7.5, 30.0, 144.0] {
            let single = calculator.calculate(&RecipeId(2), quantity).await.expect("single");
            let double = calculator.calculate(&RecipeId(2), quantity * 2.0).await.expect("double");

            for (one, two) in single.iter().zip(&double) {
                let drift = (one.required_amount * Decimal::TWO - two.required_amount).abs();
                assert!(drift <= dec("0.01"), "{} drifted by {drift}", one.name);
            }
        }
    }

    #[tokio::test]
    async fn invalid_quantity_is_rejected_before_any_lookup() {
        let catalog = Arc::new(catalog());
        let calculator = calculator(catalog.clone());

        for quantity in [-5.0, 0.0, f64::NAN, f64::INFINITY] {
            let error = calculator.calculate(&RecipeId(1), quantity).await.expect_err("invalid");
            assert!(matches!(
                error,
                ApplicationError::Domain(DomainError::InvalidInput { field: "forecast_quantity", .. })
            ));
        }
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_recipe_is_not_found() {
        let error =
            calculator(Arc::new(catalog())).calculate(&RecipeId(77), 10.0).await.expect_err("missing");
        assert_eq!(error, ApplicationError::RecipeNotFound(RecipeId(77)));
    }

    #[tokio::test]
    async fn zero_yield_recipe_is_invalid_input() {
        let error =
            calculator(Arc::new(catalog())).calculate(&RecipeId(9), 10.0).await.expect_err("zero");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::InvalidInput { field: "yield_quantity", .. })
        ));
    }

    #[tokio::test]
    async fn dangling_ingredient_reference_is_a_persistence_failure() {
        let catalog = FakeCatalog::default().with_recipe(RecipeBom {
            recipe_id: RecipeId(4),
            name: "Orphan".to_string(),
            yield_quantity: dec("1"),
            ingredients: vec![BomLine { ingredient_id: IngredientId(99), quantity_per_yield: dec("1") }],
        });
        let error =
            calculator(Arc::new(catalog)).calculate(&RecipeId(4), 1.0).await.expect_err("dangling");
        assert!(matches!(error, ApplicationError::Persistence(_)));
    }

    #[test]
    fn required_amount_rounds_half_away_from_zero() {
        assert_eq!(required_amount(dec("1"), dec("1"), dec("8")).expect("amount"), dec("0.13"));
        assert_eq!(required_amount(dec("2"), dec("25"), dec("10")).expect("amount"), dec("5.00"));
        assert!(matches!(
            required_amount(dec("2"), dec("25"), Decimal::ZERO),
            Err(DomainError::InvalidInput { field: "yield_quantity", .. })
        ));
    }

    fn requirement(name: &str, required: &str, on_hand: &str) -> IngredientRequirement {
        IngredientRequirement {
            ingredient_id: IngredientId(1),
            name: name.to_string(),
            unit: "kg".to_string(),
            required_amount: dec(required),
            current_stock: dec(on_hand),
            category: "dry goods".to_string(),
        }
    }

    #[test]
    fn stock_coverage_reports_deficits_only() {
        let requirements = vec![
            requirement("flour", "12.50", "10"),
            requirement("salt", "0.40", "2"),
            requirement("sugar", "5.00", "5"),
        ];

        let shortages = find_shortages(&requirements, &StockCoverage::default());
        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].name, "flour");
        assert_eq!(shortages[0].deficit, dec("2.50"));

        let cautious = StockCoverage { safety_margin: dec("0.10") };
        let names: Vec<_> =
            find_shortages(&requirements, &cautious).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["flour", "sugar"]);
    }

    #[test]
    fn callers_can_supply_their_own_threshold() {
        let requirements = vec![requirement("flour", "12.50", "10"), requirement("salt", "0.40", "0.5")];
        let low_water_mark = |requirement: &IngredientRequirement| {
            let remaining = requirement.current_stock - requirement.required_amount;
            (remaining < dec("1")).then(|| dec("1") - remaining)
        };

        let shortages = find_shortages(&requirements, &low_water_mark);
        assert_eq!(shortages.len(), 2);
        assert_eq!(shortages[0].deficit, dec("3.50"));
        assert_eq!(shortages[1].deficit, dec("0.90"));
    }
}
