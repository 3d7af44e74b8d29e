//! Spreadsheet import/export for booking tables

mod reader;
mod writer;

pub use reader::{load_table, read_workbook};
pub use writer::{WriteMode, sanitize_sheet_name, write_sheet};
