//! Dashboard aggregation rules

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time bucket size for movement history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    #[default]
    Month,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity: {0}")]
pub struct UnknownGranularity(pub String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    /// Accepts English names and the Portuguese period names used by the
    /// dashboard (`anual`, `mensal`, `quinzenal`; the last buckets by day).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "yearly" | "annual" | "anual" => Ok(Granularity::Year),
            "month" | "monthly" | "mensal" => Ok(Granularity::Month),
            "day" | "daily" | "diario" | "quinzenal" => Ok(Granularity::Day),
            _ => Err(UnknownGranularity(s.to_string())),
        }
    }
}

impl Granularity {
    /// First day of the bucket containing `date`
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Year => date.with_ordinal(1).unwrap_or(date),
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Day => date,
        }
    }

    /// Field name accepted by Postgres `date_trunc`
    pub fn trunc_unit(&self) -> &'static str {
        match self {
            Granularity::Year => "year",
            Granularity::Month => "month",
            Granularity::Day => "day",
        }
    }

    pub fn label(&self, period: NaiveDate) -> String {
        match self {
            Granularity::Year => period.format("%Y").to_string(),
            Granularity::Month => period.format("%Y-%m").to_string(),
            Granularity::Day => period.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Movement totals for one time bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    pub period: NaiveDate,
    pub label: String,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

impl PeriodTotal {
    pub fn new(granularity: Granularity, period: NaiveDate, total_quantity: i64, total_value: Decimal) -> Self {
        let period = granularity.truncate(period);
        Self {
            period,
            label: granularity.label(period),
            total_quantity,
            total_value,
        }
    }
}
