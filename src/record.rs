// 🧾 Tax Rate Record - the single entity of the system
//
// A record says: "jurisdiction X charges rate R on every day in
// [valid_from, valid_to]". Records are immutable facts; overlapping ranges
// are allowed and resolved by granularity precedence at read time.

use chrono::{Datelike, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{TaxError, TaxResult};

/// Dates outside this range do not keep their natural order once rendered as
/// ISO text, which is how the SQLite store compares them.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

// ============================================================================
// GRANULARITY
// ============================================================================

/// Precedence class of a validity period.
///
/// The derived `Ord` is the precedence rule: a smaller variant is more
/// specific and wins. `Daily < Weekly < Monthly < Yearly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Granularity {
    Daily = 1,
    Weekly = 2,
    Monthly = 3,
    Yearly = 4,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    /// Wire/storage rank (`period_type`)
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "Daily",
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
            Granularity::Yearly => "Yearly",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl TryFrom<i64> for Granularity {
    type Error = TaxError;

    fn try_from(rank: i64) -> TaxResult<Self> {
        match rank {
            1 => Ok(Granularity::Daily),
            2 => Ok(Granularity::Weekly),
            3 => Ok(Granularity::Monthly),
            4 => Ok(Granularity::Yearly),
            other => Err(TaxError::invalid(format!(
                "period_type must be 1 (daily), 2 (weekly), 3 (monthly) or 4 (yearly), got {}",
                other
            ))),
        }
    }
}

impl TryFrom<u8> for Granularity {
    type Error = TaxError;

    fn try_from(rank: u8) -> TaxResult<Self> {
        Granularity::try_from(i64::from(rank))
    }
}

impl From<Granularity> for u8 {
    fn from(granularity: Granularity) -> u8 {
        granularity.rank()
    }
}

impl ToSql for Granularity {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.rank())))
    }
}

impl FromSql for Granularity {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let rank = value.as_i64()?;
        Granularity::try_from(rank).map_err(|_| FromSqlError::OutOfRange(rank))
    }
}

// ============================================================================
// RECORD ID
// ============================================================================

/// Store-assigned identifier. Monotonically increasing, never reused.
/// Only for debugging and audit; queries never look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// TAX RATE RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRateRecord {
    #[serde(rename = "municipality")]
    pub jurisdiction: String,

    #[serde(rename = "period_type")]
    pub granularity: Granularity,

    /// Inclusive lower bound
    #[serde(rename = "date_start")]
    pub valid_from: NaiveDate,

    /// Inclusive upper bound
    #[serde(rename = "date_end")]
    pub valid_to: NaiveDate,

    #[serde(rename = "tax_rate")]
    pub rate: f64,
}

impl TaxRateRecord {
    pub fn new(
        jurisdiction: impl Into<String>,
        granularity: Granularity,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
        rate: f64,
    ) -> Self {
        TaxRateRecord {
            jurisdiction: jurisdiction.into(),
            granularity,
            valid_from,
            valid_to,
            rate,
        }
    }

    /// Check the write-path invariants. Stores call this before persisting.
    pub fn validate(&self) -> TaxResult<()> {
        if self.jurisdiction.trim().is_empty() {
            return Err(TaxError::invalid("municipality must not be empty"));
        }

        if self.valid_from > self.valid_to {
            return Err(TaxError::invalid(format!(
                "date_start {} is after date_end {}",
                self.valid_from, self.valid_to
            )));
        }

        for (field, date) in [("date_start", self.valid_from), ("date_end", self.valid_to)] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                return Err(TaxError::invalid(format!(
                    "{} {} is outside years {}..={}",
                    field, date, MIN_YEAR, MAX_YEAR
                )));
            }
        }

        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(TaxError::invalid(format!(
                "tax_rate must be a non-negative number, got {}",
                self.rate
            )));
        }

        Ok(())
    }

    /// Closed-interval overlap: `valid_from <= date <= valid_to`
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> TaxResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| TaxError::invalid(format!("Invalid date format '{}': {}", raw, e)))
}
