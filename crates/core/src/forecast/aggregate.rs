use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::sales::{DailyPoint, DailySeries, SalesRecord};

/// Collapses sale events into one total per UTC calendar day, ascending by date.
///
/// Days with no events do not appear in the output. An empty input yields an
/// empty series; length checks belong to the consumers.
pub fn aggregate_daily(records: &[SalesRecord]) -> DailySeries {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.sold_at.date_naive()).or_insert(0.0) += record.quantity;
    }

    let points = totals
        .into_iter()
        .map(|(date, quantity)| DailyPoint { date, quantity })
        .collect::<Vec<_>>();

    DailySeries::from_sorted(points).unwrap_or_default()
}
