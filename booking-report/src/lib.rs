//! Booking spreadsheet normalization and occupancy/income reporting

pub mod aggregate;
pub mod config;
pub mod error;
pub mod excel;
pub mod model;
pub mod normalize;
pub mod report;
pub mod table;

pub use config::AppConfig;
pub use error::{ReportError, Result};
pub use model::{Booking, Period};
pub use report::{RunSummary, run};
