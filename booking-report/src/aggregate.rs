//! Monthly occupancy and income per property

use std::collections::BTreeMap;

use crate::model::{Booking, Period};

/// Totals for one property in one month
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub property: String,
    pub period: Period,
    pub stay_days: i64,
    pub income: f64,
}

/// Totals for every (property, period) pair, ordered by property then period.
///
/// Bookings without a property name are left out, they cannot be grouped.
pub fn summarize_all(bookings: &[Booking]) -> Vec<MonthlySummary> {
    let mut groups: BTreeMap<(&str, Period), (i64, f64)> = BTreeMap::new();

    for booking in bookings.iter().filter(|b| !b.property.is_empty()) {
        let totals = groups
            .entry((booking.property.as_str(), booking.period))
            .or_default();
        totals.0 += booking.stay_days;
        totals.1 += booking.income;
    }

    groups
        .into_iter()
        .map(|((property, period), (stay_days, income))| MonthlySummary {
            property: property.to_string(),
            period,
            stay_days,
            income,
        })
        .collect()
}

/// Totals for `period` only; empty when nothing arrived in that month
pub fn summarize(bookings: &[Booking], period: Period) -> Vec<MonthlySummary> {
    summarize_all(bookings)
        .into_iter()
        .filter(|summary| summary.period == period)
        .collect()
}
