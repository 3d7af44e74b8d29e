//! Read spreadsheet files into tables

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{ReportError, Result};
use crate::table::{Table, Value};

/// Read the first sheet of a spreadsheet file.
///
/// The first row becomes the header, remaining rows are returned as-is
/// without any schema checks.
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(ReportError::NotFound(path.to_path_buf()));
    }

    let mut sheets = read_workbook(path)?;
    if sheets.is_empty() {
        return Err(read_error(path, "workbook has no sheets"));
    }

    let (sheet_name, table) = sheets.swap_remove(0);
    log::info!(
        "Loaded {} rows from sheet '{}' of {}",
        table.len(),
        sheet_name,
        path.display()
    );
    Ok(table)
}

/// Read every sheet of a spreadsheet file, in workbook order
pub fn read_workbook(path: &Path) -> Result<Vec<(String, Table)>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| read_error(path, e))?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| read_error(path, format!("sheet '{}': {}", sheet_name, e)))?;
        sheets.push((sheet_name, range_to_table(&range)));
    }

    Ok(sheets)
}

fn read_error(path: &Path, reason: impl ToString) -> ReportError {
    ReportError::Read {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header) => header.iter().map(header_name).collect(),
        None => return Table::default(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        // Skip empty rows
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        table.push_row(row.iter().map(cell_value).collect());
    }

    table
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        other => cell_value(other).to_text(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => Value::Date(ts.date()),
            Some(ts) => Value::DateTime(ts),
            None => Value::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s).unwrap_or_else(|| Value::String(s.clone())),
        Data::DurationIso(s) => Value::String(s.clone()),
    }
}

fn parse_iso(s: &str) -> Option<Value> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Value::DateTime(ts));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date)
}

/// Convert a spreadsheet serial date (days since 1899-12-30) to a timestamp
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(chrono::NaiveTime::MIN);
    let days = serial.trunc() as i64;
    // Round to the second; serials carry float noise in the fraction
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;

    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}
