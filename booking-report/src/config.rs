//! Report configuration: column names, sheet names and the commission table
//!
//! Loaded from an optional TOML file. Every field has a default, so an empty
//! or partial file is valid.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ReportError, Result};

/// Column names of the input sheet and of the derived output columns
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Managed unit being booked
    pub property: String,
    /// Booking channel, drives the commission rate
    pub source: String,
    /// Gross booking amount
    pub amount: String,
    pub arrival: String,
    pub departure: String,
    /// Amount after commission
    pub income: String,
    /// Year-month of arrival
    pub period: String,
    /// Nights between arrival and departure
    pub stay_days: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            property: "Объект".to_string(),
            source: "Источник".to_string(),
            amount: "Сумма".to_string(),
            arrival: "Заезд".to_string(),
            departure: "Выезд".to_string(),
            income: "Доход".to_string(),
            period: "Месяц".to_string(),
            stay_days: "Дни_проживания".to_string(),
        }
    }
}

impl ColumnNames {
    /// Columns the input sheet must contain
    pub fn required(&self) -> [&str; 5] {
        [
            &self.property,
            &self.source,
            &self.amount,
            &self.arrival,
            &self.departure,
        ]
    }
}

/// Output layout settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Name of the monthly occupancy/income sheet
    pub summary_sheet: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            summary_sheet: "Анализ прод-ти пребывания".to_string(),
        }
    }
}

/// One commission bucket: every source in `sources` pays out `rate` of the amount
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionBucket {
    pub rate: f64,
    pub sources: HashSet<String>,
}

impl CommissionBucket {
    pub fn new<I, S>(rate: f64, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rate,
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered commission buckets. Lookups scan in order and the first bucket
/// containing the source wins, so overlapping buckets are resolved by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommissionTable {
    buckets: Vec<CommissionBucket>,
}

impl CommissionTable {
    pub fn new(buckets: Vec<CommissionBucket>) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[CommissionBucket] {
        &self.buckets
    }

    /// Rate of the first bucket that lists `source`
    pub fn rate_for(&self, source: &str) -> Option<f64> {
        self.buckets
            .iter()
            .find(|bucket| bucket.sources.contains(source))
            .map(|bucket| bucket.rate)
    }

    /// Income left after commission; unknown sources keep the full amount
    pub fn income(&self, source: &str, amount: f64) -> f64 {
        match self.rate_for(source) {
            Some(rate) => amount * rate,
            None => amount,
        }
    }
}

/// Rate as written in the config file, either `"0.85"` or `0.85`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateRepr {
    Text(String),
    Number(f64),
}

#[derive(Debug, Deserialize)]
struct BucketEntry {
    rate: RateRepr,
    #[serde(default)]
    sources: Vec<String>,
}

/// Shape of the TOML file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    columns: ColumnNames,
    #[serde(default)]
    report: ReportSettings,
    #[serde(default)]
    commission: Vec<BucketEntry>,
}

/// Resolved configuration shared by every pipeline stage
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub columns: ColumnNames,
    pub report: ReportSettings,
    pub commission: CommissionTable,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| ReportError::Config(e.to_string()))?;

        let mut buckets = Vec::with_capacity(file.commission.len());
        for entry in file.commission {
            let rate = parse_rate(&entry.rate)?;
            buckets.push(CommissionBucket::new(rate, entry.sources));
        }

        Ok(Self {
            columns: file.columns,
            report: file.report,
            commission: CommissionTable::new(buckets),
        })
    }
}

fn parse_rate(rate: &RateRepr) -> Result<f64> {
    let value = match rate {
        RateRepr::Number(n) => *n,
        RateRepr::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ReportError::Config(format!("commission rate {:?} is not a number", s)))?,
    };

    if !value.is_finite() || value < 0.0 {
        return Err(ReportError::Config(format!(
            "commission rate {} must be a non-negative number",
            value
        )));
    }
    Ok(value)
}
