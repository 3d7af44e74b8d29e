//! Write tables as named sheets into a report workbook

use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};

use super::reader::read_workbook;
use crate::config::ColumnNames;
use crate::error::{ReportError, Result};
use crate::table::{Table, Value};

/// How a sheet write treats an existing output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file with a workbook holding only the new sheet
    Overwrite,
    /// Keep the sheets already in the file and add the new one after them
    Append,
}

/// Cell formats shared by every sheet of a workbook
struct Formats {
    header: Format,
    date: Format,
    datetime: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

/// Write `table` as sheet `sheet_name` into the workbook at `path`.
///
/// Arrival and departure timestamps are written as plain dates. Appending
/// to a file that does not exist falls back to overwriting it. Returns the
/// mode that was actually used.
pub fn write_sheet(
    table: &Table,
    sheet_name: &str,
    path: &Path,
    mode: WriteMode,
    columns: &ColumnNames,
) -> Result<WriteMode> {
    let sheet_name = sanitize_sheet_name(sheet_name);
    let write_error = |reason: String| ReportError::Write {
        sheet: sheet_name.clone(),
        path: path.to_path_buf(),
        reason,
    };

    let mut table = table.clone();
    if table.has_column(&columns.arrival) && table.has_column(&columns.departure) {
        table.coerce_dates(&[columns.arrival.as_str(), columns.departure.as_str()]);
    }

    let mut mode = mode;
    if mode == WriteMode::Append && !path.exists() {
        log::warn!(
            "Sheet write order violated: '{}' appended to missing file {}, creating it instead",
            sheet_name,
            path.display()
        );
        mode = WriteMode::Overwrite;
    }

    let mut sheets = match mode {
        WriteMode::Overwrite => Vec::new(),
        WriteMode::Append => read_workbook(path).map_err(|e| write_error(e.to_string()))?,
    };

    let lowered = sheet_name.to_lowercase();
    if sheets.iter().any(|(name, _)| name.to_lowercase() == lowered) {
        return Err(write_error("a sheet with this name already exists".to_string()));
    }
    sheets.push((sheet_name.clone(), table));

    let mut workbook = Workbook::new();
    let formats = Formats::new();
    for (name, sheet_table) in &sheets {
        add_table_sheet(&mut workbook, name, sheet_table, &formats)
            .map_err(|e| write_error(e.to_string()))?;
    }

    workbook
        .save(path)
        .map_err(|e| write_error(e.to_string()))?;

    log::info!("Saved sheet '{}' to {}", sheet_name, path.display());
    Ok(mode)
}

/// Sheet names cannot contain path separators
pub fn sanitize_sheet_name(name: &str) -> String {
    name.replace(['/', '\\'], ".")
}

fn add_table_sheet(
    workbook: &mut Workbook,
    name: &str,
    table: &Table,
    formats: &Formats,
) -> std::result::Result<(), XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;

    for (col, header) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &formats.header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            write_value(sheet, row_num, col as u16, value, formats)?;
        }
    }

    sheet.autofit();
    Ok(())
}

fn write_value(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    formats: &Formats,
) -> std::result::Result<(), XlsxError> {
    match value {
        Value::Null => { /* Leave cell empty */ }
        Value::String(s) => { ws.write_string(row, col, s)?; }
        Value::Int(i) => { ws.write_number(row, col, *i as f64)?; }
        Value::Float(f) => { ws.write_number(row, col, *f)?; }
        Value::Bool(b) => { ws.write_boolean(row, col, *b)?; }
        Value::Date(d) => {
            ws.write_datetime_with_format(row, col, &excel_date(d)?, &formats.date)?;
        }
        Value::DateTime(dt) => {
            ws.write_datetime_with_format(row, col, &excel_datetime(dt)?, &formats.datetime)?;
        }
    }
    Ok(())
}

fn excel_date(date: &NaiveDate) -> std::result::Result<ExcelDateTime, XlsxError> {
    ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)
}

fn excel_datetime(ts: &NaiveDateTime) -> std::result::Result<ExcelDateTime, XlsxError> {
    excel_date(&ts.date())?.and_hms(ts.hour() as u16, ts.minute() as u8, f64::from(ts.second()))
}
