//! Error type shared by the loader, normalizer and writer

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read spreadsheet {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    /// Every required column absent from the input header
    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Row {row}: amount {value:?} is not a number")]
    InvalidAmount { row: usize, value: String },

    #[error("Failed to write sheet '{sheet}' to {}: {reason}", .path.display())]
    Write {
        sheet: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReportError {
    /// Dataset-level validation failures (schema or cell contents)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReportError::MissingColumns(_) | ReportError::InvalidAmount { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
