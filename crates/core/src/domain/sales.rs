use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::recipe::RecipeId;
use crate::errors::DomainError;

/// A single sale event as reported by the sales history collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub sold_at: DateTime<Utc>,
    pub quantity: f64,
    pub recipe_id: RecipeId,
    pub recipe_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Daily totals in ascending date order, one point per day that had sales.
///
/// Days without sales are absent rather than zero. Serialized as a plain array of points;
/// deserializing goes through the same ordering check as [`DailySeries::from_sorted`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DailyPoint>", into = "Vec<DailyPoint>")]
pub struct DailySeries {
    points: Vec<DailyPoint>,
}

impl DailySeries {
    /// Builds a series from points that are already strictly increasing by date.
    ///
    /// Returns `None` when the ordering invariant does not hold.
    pub fn from_sorted(points: Vec<DailyPoint>) -> Option<Self> {
        let ordered = points.windows(2).all(|pair| pair[0].date < pair[1].date);
        ordered.then_some(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    pub fn quantities(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.quantity).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|point| point.date)
    }

    pub fn total_quantity(&self) -> f64 {
        self.points.iter().map(|point| point.quantity).sum()
    }
}

impl TryFrom<Vec<DailyPoint>> for DailySeries {
    type Error = DomainError;

    fn try_from(points: Vec<DailyPoint>) -> Result<Self, Self::Error> {
        Self::from_sorted(points)
            .ok_or_else(|| DomainError::invalid("points", "dates must be strictly increasing"))
    }
}

impl From<DailySeries> for Vec<DailyPoint> {
    fn from(series: DailySeries) -> Self {
        series.points
    }
}

/// Training pair: `features` are consecutive daily quantities, `label` is the day after.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowSample {
    pub features: Vec<f64>,
    pub label: f64,
}
