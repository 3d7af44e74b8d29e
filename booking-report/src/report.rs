//! Booking report builder
//!
//! Generates an Excel report containing:
//! - All normalized bookings
//! - Occupancy and income summary for the reporting month
//! - One sheet of bookings per property

use std::path::Path;

use crate::aggregate::{MonthlySummary, summarize};
use crate::config::{AppConfig, ColumnNames};
use crate::error::Result;
use crate::excel::{WriteMode, load_table, sanitize_sheet_name, write_sheet};
use crate::model::{Booking, Period};
use crate::normalize::{Normalized, normalize};
use crate::table::{Table, Value};

/// What a report run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub rows_loaded: usize,
    pub rows_kept: usize,
    pub dropped_invalid_dates: usize,
    pub dropped_non_positive: usize,
    pub summary_rows: usize,
    /// Sheet names in the order they were written
    pub sheets_written: Vec<String>,
}

/// Build the full report from `input` into `output`.
///
/// Sheets are written one at a time; if a write fails, sheets written
/// before it stay in the output file.
pub fn run(config: &AppConfig, input: &Path, output: &Path, period: Period) -> Result<RunSummary> {
    let columns = &config.columns;

    let table = load_table(input)?;
    let normalized = normalize(&table, config)?;

    let mut summary = RunSummary {
        rows_loaded: table.len(),
        rows_kept: normalized.bookings.len(),
        dropped_invalid_dates: normalized.dropped_invalid_dates,
        dropped_non_positive: normalized.dropped_non_positive,
        ..RunSummary::default()
    };

    let mut write = |table: &Table, name: &str, mode: WriteMode| -> Result<()> {
        write_sheet(table, name, output, mode, columns)?;
        summary.sheets_written.push(sanitize_sheet_name(name));
        Ok(())
    };

    let all = bookings_table(&normalized, normalized.bookings.iter(), columns);
    write(&all, &main_sheet_name(output), WriteMode::Overwrite)?;

    let monthly = summarize(&normalized.bookings, period);
    log::info!("{} properties with arrivals in {}", monthly.len(), period);
    write(
        &summary_table(&monthly, columns),
        &config.report.summary_sheet,
        WriteMode::Append,
    )?;

    for property in normalized.properties() {
        if property.is_empty() {
            log::warn!("Bookings without a property name get no sheet of their own");
            continue;
        }
        let sheet = bookings_table(&normalized, normalized.for_property(property), columns);
        write(&sheet, property, WriteMode::Append)?;
    }

    summary.summary_rows = monthly.len();
    Ok(summary)
}

/// Name of the sheet holding every booking: the output file name up to its
/// first dot
pub fn main_sheet_name(output: &Path) -> String {
    let file_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => "Bookings".to_string(),
    }
}

/// Input columns followed by income, period and stay length. A derived column
/// that already exists in the input is overwritten in place.
pub fn bookings_table<'a>(
    normalized: &Normalized,
    bookings: impl Iterator<Item = &'a Booking>,
    columns: &ColumnNames,
) -> Table {
    let mut headers = normalized.headers.clone();
    let mut position = |name: &str| match headers.iter().position(|h| h == name) {
        Some(idx) => idx,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    };

    let arrival = position(&columns.arrival);
    let departure = position(&columns.departure);
    let income = position(&columns.income);
    let period = position(&columns.period);
    let stay_days = position(&columns.stay_days);

    let mut table = Table::new(headers);
    for booking in bookings {
        let mut row = booking.row.clone();
        row.resize(table.headers.len(), Value::Null);
        row[arrival] = Value::DateTime(booking.arrival);
        row[departure] = Value::DateTime(booking.departure);
        row[income] = Value::Float(booking.income);
        row[period] = Value::String(booking.period.to_string());
        row[stay_days] = Value::Int(booking.stay_days);
        table.push_row(row);
    }

    table
}

/// One row per property: property, period, stay days, income
pub fn summary_table(rows: &[MonthlySummary], columns: &ColumnNames) -> Table {
    let mut table = Table::new(vec![
        columns.property.clone(),
        columns.period.clone(),
        columns.stay_days.clone(),
        columns.income.clone(),
    ]);

    for row in rows {
        table.push_row(vec![
            Value::String(row.property.clone()),
            Value::String(row.period.to_string()),
            Value::Int(row.stay_days),
            Value::Float(row.income),
        ]);
    }

    table
}
