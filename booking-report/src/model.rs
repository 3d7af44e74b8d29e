//! Booking records and the year-month period they are grouped by

use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDateTime};

use crate::error::ReportError;
use crate::table::Value;

/// Calendar year and month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Returns None for a month outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Period { year, month })
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Period {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Period of the local system date
    pub fn current() -> Self {
        Self::of(&Local::now().date_naive())
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ReportError;

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::Config(format!("period {:?} is not in YYYY-MM form", s));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Period::new(year, month).ok_or_else(invalid)
    }
}

/// A validated booking with its derived fields
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// Original cells of the input row, in input column order
    pub row: Vec<Value>,
    pub property: String,
    pub source: String,
    pub amount: f64,
    pub arrival: NaiveDateTime,
    pub departure: NaiveDateTime,
    /// Amount after commission
    pub income: f64,
    /// Year-month of arrival
    pub period: Period,
    /// Whole days between arrival and departure
    pub stay_days: i64,
}
