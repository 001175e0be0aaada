use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipeId(pub i64);

impl RecipeId {
    /// Parses an operator-supplied identifier. Recipe identifiers are positive integers.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            Ok(_) => Err(DomainError::invalid("recipe_id", "must be a positive integer")),
            Err(_) => Err(DomainError::invalid(
                "recipe_id",
                format!("`{trimmed}` is not a numeric recipe id"),
            )),
        }
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngredientId(pub i64);

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bill-of-materials line: how much of an ingredient one recipe yield consumes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub ingredient_id: IngredientId,
    pub quantity_per_yield: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBom {
    pub recipe_id: RecipeId,
    pub name: String,
    pub yield_quantity: Decimal,
    pub ingredients: Vec<BomLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientStock {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub unit: String,
    pub current_stock: Decimal,
    pub category: String,
}

/// Required amount of one ingredient for a forecast quantity, next to what is on hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRequirement {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub unit: String,
    pub required_amount: Decimal,
    pub current_stock: Decimal,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::RecipeId;
    use crate::errors::DomainError;

    #[test]
    fn parses_numeric_recipe_ids() {
        assert_eq!(RecipeId::parse(" 42 ").expect("numeric id"), RecipeId(42));
    }

    #[test]
    fn rejects_non_numeric_and_non_positive_ids() {
        for raw in ["sourdough", "", "0", "-3", "4.5"] {
            let error = RecipeId::parse(raw).expect_err("should reject");
            assert!(
                matches!(error, DomainError::InvalidInput { field: "recipe_id", .. }),
                "unexpected error for `{raw}`: {error:?}"
            );
        }
    }
}
