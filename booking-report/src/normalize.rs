//! Turn a raw bookings table into validated, sorted booking records
//!
//! Steps, in order:
//! - check that every required column is present
//! - compute income from the commission table
//! - parse arrival/departure dates (day-first)
//! - drop rows with a missing date (logged as a warning)
//! - derive the arrival period and sort by property, then arrival
//! - derive the stay length and drop stays of zero or fewer days

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::{AppConfig, ColumnNames};
use crate::error::{ReportError, Result};
use crate::model::{Booking, Period};
use crate::table::{Table, Value};

/// Years a spreadsheet date cell can hold; anything outside is a missing date
const SPREADSHEET_YEARS: RangeInclusive<i32> = 1900..=9999;

/// Result of normalizing a bookings table
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Headers of the input table
    pub headers: Vec<String>,
    /// Valid bookings sorted by (property, arrival)
    pub bookings: Vec<Booking>,
    /// Rows dropped because arrival or departure could not be parsed
    pub dropped_invalid_dates: usize,
    /// Rows dropped because departure was not after arrival
    pub dropped_non_positive: usize,
}

impl Normalized {
    /// Distinct property names in ascending order
    pub fn properties(&self) -> Vec<&str> {
        let mut properties: Vec<&str> = self.bookings.iter().map(|b| b.property.as_str()).collect();
        properties.dedup();
        properties
    }

    /// Bookings of a single property, keeping the sort order
    pub fn for_property<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Booking> + 'a {
        self.bookings.iter().filter(move |b| b.property == property)
    }
}

/// Column positions of the required inputs
struct RequiredColumns {
    property: usize,
    source: usize,
    amount: usize,
    arrival: usize,
    departure: usize,
}

/// Fails with every missing column name if any required column is absent
fn check_schema(table: &Table, columns: &ColumnNames) -> Result<RequiredColumns> {
    let missing: Vec<String> = columns
        .required()
        .iter()
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ReportError::MissingColumns(missing));
    }

    let index = |name: &str| table.column_index(name).unwrap_or_default();
    Ok(RequiredColumns {
        property: index(&columns.property),
        source: index(&columns.source),
        amount: index(&columns.amount),
        arrival: index(&columns.arrival),
        departure: index(&columns.departure),
    })
}

/// Validate and enrich every row of `table`
pub fn normalize(table: &Table, config: &AppConfig) -> Result<Normalized> {
    let cols = check_schema(table, &config.columns)?;

    // Income for every row first, so a bad amount fails the run even on rows
    // that would later be filtered out
    let mut parsed = Vec::with_capacity(table.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        // +2: 1-based, plus the header row
        let amount = parse_amount(&row[cols.amount], row_idx + 2)?;
        let source = row[cols.source].to_text();
        let income = config.commission.income(&source, amount);

        parsed.push((
            row,
            source,
            amount,
            income,
            parse_date(&row[cols.arrival]),
            parse_date(&row[cols.departure]),
        ));
    }

    let total = parsed.len();
    let mut bookings: Vec<Booking> = parsed
        .into_iter()
        .filter_map(|(row, source, amount, income, arrival, departure)| {
            let (arrival, departure) = (arrival?, departure?);
            Some(Booking {
                row: row.clone(),
                property: row[cols.property].to_text(),
                source,
                amount,
                arrival,
                departure,
                income,
                period: Period::of(&arrival),
                stay_days: stay_days(arrival, departure),
            })
        })
        .collect();

    let dropped_invalid_dates = total - bookings.len();
    if dropped_invalid_dates > 0 {
        log::warn!(
            "Skipped {} rows with invalid arrival or departure dates",
            dropped_invalid_dates
        );
    }

    // Stable: rows with equal keys keep input order
    bookings.sort_by(|a, b| {
        a.property
            .cmp(&b.property)
            .then_with(|| a.arrival.cmp(&b.arrival))
    });

    let before = bookings.len();
    bookings.retain(|b| b.stay_days > 0);
    let dropped_non_positive = before - bookings.len();
    if dropped_non_positive > 0 {
        log::debug!("Dropped {} rows with non-positive stay length", dropped_non_positive);
    }

    Ok(Normalized {
        headers: table.headers.clone(),
        bookings,
        dropped_invalid_dates,
        dropped_non_positive,
    })
}

/// Whole days from arrival to departure, rounded down
pub fn stay_days(arrival: NaiveDateTime, departure: NaiveDateTime) -> i64 {
    (departure - arrival).num_seconds().div_euclid(86_400)
}

fn parse_amount(value: &Value, row: usize) -> Result<f64> {
    let invalid = || ReportError::InvalidAmount {
        row,
        value: value.to_text(),
    };

    match value {
        Value::Null => Ok(0.0),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) if f.is_finite() => Ok(*f),
        Value::String(s) => {
            // "1 250,50" style: spaces as thousands separators, comma decimal
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            // f64's parser also takes "NaN" and "inf"
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|amount| amount.is_finite())
                .ok_or_else(invalid)
        }
        Value::Float(_) | Value::Bool(_) | Value::Date(_) | Value::DateTime(_) => Err(invalid()),
    }
}

/// Parse a date cell, reading ambiguous text as day-first.
///
/// Returns None for anything that is not a date, including plain numbers
/// and dates before 1900 or after 9999.
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    let parsed = match value {
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => parse_date_str(s),
        _ => None,
    };
    parsed.filter(|dt| SPREADSHEET_YEARS.contains(&dt.year()))
}

fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let (date_part, time_part) = match s.split_once([' ', 'T']) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (s, None),
    };

    let date = parse_day_first(date_part)?;
    let time = match time_part {
        None | Some("") => NaiveTime::MIN,
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
            .ok()?,
    };

    Some(date.and_time(time))
}

fn parse_day_first(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['.', '/', '-']).collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    // Year-first input is unambiguous
    if first.len() == 4 {
        return NaiveDate::from_ymd_opt(first.parse().ok()?, second.parse().ok()?, third.parse().ok()?);
    }

    let day: u32 = first.parse().ok()?;
    let month: u32 = second.parse().ok()?;
    let year: i32 = match third.len() {
        4 => third.parse().ok()?,
        // Two-digit years pivot like strptime's %y
        2 => {
            let yy: i32 = third.parse().ok()?;
            if yy < 69 { 2000 + yy } else { 1900 + yy }
        }
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommissionBucket, CommissionTable};

    fn config() -> AppConfig {
        AppConfig {
            commission: CommissionTable::new(vec![CommissionBucket::new(0.85, ["Booking.com"])]),
            ..AppConfig::default()
        }
    }

    fn table(rows: Vec<[&str; 5]>) -> Table {
        let mut table = Table::new(
            ["Объект", "Источник", "Сумма", "Заезд", "Выезд", "Гость"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for [property, source, amount, arrival, departure] in rows {
            table.push_row(vec![
                Value::from(property),
                Value::from(source),
                Value::Float(amount.parse().unwrap()),
                Value::from(arrival),
                Value::from(departure),
                Value::from("guest"),
            ]);
        }
        table
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_single_booking_with_commission() {
        let input = table(vec![["Hotel A", "Booking.com", "1000", "01.03.2025", "03.03.2025"]]);

        let result = normalize(&input, &config()).unwrap();

        assert_eq!(result.bookings.len(), 1);
        let booking = &result.bookings[0];
        assert!((booking.income - 850.0).abs() < 1e-9);
        assert_eq!(booking.stay_days, 2);
        assert_eq!(booking.period.to_string(), "2025-03");
        assert_eq!(booking.arrival, date(2025, 3, 1));
        assert_eq!(booking.row.len(), 6);
    }

    #[test]
    fn test_unknown_source_keeps_full_amount() {
        let input = table(vec![["Hotel A", "Direct", "1000", "01.03.2025", "03.03.2025"]]);

        let result = normalize(&input, &config()).unwrap();

        assert_eq!(result.bookings[0].income, 1000.0);
    }

    #[test]
    fn test_same_day_stay_dropped_without_date_warning() {
        let input = table(vec![
            ["Hotel A", "Direct", "500", "05.03.2025", "05.03.2025"],
            ["Hotel A", "Direct", "500", "07.03.2025", "06.03.2025"],
        ]);

        let result = normalize(&input, &config()).unwrap();

        assert!(result.bookings.is_empty());
        assert_eq!(result.dropped_non_positive, 2);
        assert_eq!(result.dropped_invalid_dates, 0);
    }

    #[test]
    fn test_unparseable_dates_are_counted_and_dropped() {
        let input = table(vec![
            ["Hotel A", "Direct", "500", "not a date", "06.03.2025"],
            ["Hotel A", "Direct", "500", "05.03.2025", ""],
            ["Hotel A", "Direct", "500", "31.02.2025", "03.03.2025"],
            ["Hotel A", "Direct", "500", "01.03.2025", "03.03.2025"],
        ]);

        let result = normalize(&input, &config()).unwrap();

        assert_eq!(result.dropped_invalid_dates, 3);
        assert_eq!(result.dropped_non_positive, 0);
        assert_eq!(result.bookings.len(), 1);
    }

    #[test]
    fn test_missing_columns_are_all_reported() {
        let mut input = Table::new(vec!["Объект".into(), "Заезд".into()]);
        input.push_row(vec![Value::from("Hotel A"), Value::from("01.03.2025")]);

        let err = normalize(&input, &config()).unwrap_err();

        match err {
            ReportError::MissingColumns(missing) => {
                assert_eq!(missing, vec!["Источник", "Сумма", "Выезд"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_sorted_by_property_then_arrival() {
        let input = table(vec![
            ["Hotel B", "Direct", "1", "10.03.2025", "12.03.2025"],
            ["Hotel A", "Direct", "2", "15.03.2025", "16.03.2025"],
            ["Hotel B", "Direct", "3", "01.03.2025", "02.03.2025"],
            ["Hotel A", "Direct", "4", "02.03.2025", "05.03.2025"],
        ]);

        let result = normalize(&input, &config()).unwrap();

        let order: Vec<(&str, f64)> = result
            .bookings
            .iter()
            .map(|b| (b.property.as_str(), b.amount))
            .collect();
        assert_eq!(
            order,
            vec![("Hotel A", 4.0), ("Hotel A", 2.0), ("Hotel B", 3.0), ("Hotel B", 1.0)]
        );

        for pair in result.bookings.windows(2) {
            assert!(pair[0].property <= pair[1].property);
            if pair[0].property == pair[1].property {
                assert!(pair[0].arrival <= pair[1].arrival);
            }
        }
        assert_eq!(result.properties(), vec!["Hotel A", "Hotel B"]);
        assert_eq!(result.for_property("Hotel B").count(), 2);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let input = table(vec![
            ["Hotel B", "Direct", "5", "01.03.2025", "04.03.2025"],
            ["Hotel A", "Direct", "3", "01.03.2025", "02.03.2025"],
            ["Hotel A", "Direct", "1", "01.03.2025", "03.03.2025"],
            ["Hotel A", "Direct", "2", "01.03.2025", "05.03.2025"],
        ]);

        let result = normalize(&input, &config()).unwrap();

        let amounts: Vec<f64> = result.for_property("Hotel A").map(|b| b.amount).collect();
        assert_eq!(amounts, vec![3.0, 1.0, 2.0]);
        assert_eq!(result.bookings[3].amount, 5.0);
    }

    #[test]
    fn test_amount_text_and_empty_cells() {
        assert_eq!(parse_amount(&Value::from("1 250,50"), 2).unwrap(), 1250.5);
        assert_eq!(parse_amount(&Value::Int(300), 2).unwrap(), 300.0);
        assert_eq!(parse_amount(&Value::Null, 2).unwrap(), 0.0);

        let err = parse_amount(&Value::from("free"), 7).unwrap_err();
        assert!(matches!(err, ReportError::InvalidAmount { row: 7, .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_non_finite_amounts_are_invalid() {
        for text in ["NaN", "inf", "-infinity", "Infinity"] {
            let err = parse_amount(&Value::from(text), 3).unwrap_err();
            assert!(matches!(err, ReportError::InvalidAmount { row: 3, .. }), "{text}");
        }
        assert!(parse_amount(&Value::Float(f64::NAN), 3).is_err());

        let mut input = table(vec![["Hotel A", "Direct", "1", "01.03.2025", "02.03.2025"]]);
        input.rows[0][2] = Value::from("inf");
        let err = normalize(&input, &config()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidAmount { row: 2, .. }));
    }

    #[test]
    fn test_invalid_amount_aborts_normalization() {
        let mut input = table(vec![["Hotel A", "Direct", "1", "01.03.2025", "02.03.2025"]]);
        input.rows[0][2] = Value::from("n/a");

        let err = normalize(&input, &config()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidAmount { row: 2, .. }));
    }

    #[test]
    fn test_date_formats_are_day_first() {
        assert_eq!(parse_date(&Value::from("01.03.2025")), Some(date(2025, 3, 1)));
        assert_eq!(parse_date(&Value::from("01/03/2025")), Some(date(2025, 3, 1)));
        assert_eq!(parse_date(&Value::from("01-03-25")), Some(date(2025, 3, 1)));
        assert_eq!(parse_date(&Value::from("2025-03-01")), Some(date(2025, 3, 1)));
        assert_eq!(
            parse_date(&Value::from("01.03.2025 14:30")),
            Some(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(14, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date(&Value::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())),
            Some(date(2025, 3, 1))
        );

        assert_eq!(parse_date(&Value::Float(45717.0)), None);
        assert_eq!(parse_date(&Value::Null), None);
        assert_eq!(parse_date(&Value::from("13.13.2025")), None);
    }

    #[test]
    fn test_years_outside_spreadsheet_range_are_missing() {
        assert_eq!(parse_date(&Value::from("01.03.0025")), None);
        assert_eq!(parse_date(&Value::from("0025-03-01")), None);
        assert_eq!(parse_date(&Value::Date(NaiveDate::from_ymd_opt(1850, 3, 1).unwrap())), None);
        assert_eq!(parse_date(&Value::DateTime(date(10_000, 1, 1))), None);
        assert_eq!(parse_date(&Value::from("01.01.1900")), Some(date(1900, 1, 1)));
        assert_eq!(parse_date(&Value::from("31.12.9999")), Some(date(9999, 12, 31)));

        let input = table(vec![
            ["Hotel A", "Direct", "500", "01.03.2025", "03.03.2025"],
            ["Hotel B", "Direct", "500", "01.03.0025", "03.03.0025"],
        ]);

        let result = normalize(&input, &config()).unwrap();

        assert_eq!(result.dropped_invalid_dates, 1);
        assert_eq!(result.properties(), vec!["Hotel A"]);
    }

    #[test]
    fn test_stay_days_round_down() {
        let arrival = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(14, 0, 0).unwrap();
        let departure = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(12, 0, 0).unwrap();

        assert_eq!(stay_days(arrival, departure), 1);
        assert_eq!(stay_days(departure, arrival), -2);
        assert_eq!(stay_days(arrival, arrival), 0);
    }
}
