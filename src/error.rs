// Error taxonomy for the rate store and resolver
//
// Every variant is returned to the immediate caller; nothing in the library
// logs-and-swallows.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxError {
    /// Malformed record at insert time. Rejected, never stored.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// No record for the jurisdiction covers the date.
    #[error("no tax rate for {jurisdiction} on {date}")]
    NotFound {
        jurisdiction: String,
        date: NaiveDate,
    },

    /// The backing storage failed. Surfaced as-is, no retry.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl TaxError {
    pub fn invalid(message: impl Into<String>) -> Self {
        TaxError::InvalidRecord(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaxError::NotFound { .. })
    }
}

impl From<rusqlite::Error> for TaxError {
    fn from(err: rusqlite::Error) -> Self {
        TaxError::StorageUnavailable(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for TaxError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        TaxError::StorageUnavailable(format!("store lock poisoned: {}", err))
    }
}

pub type TaxResult<T> = std::result::Result<T, TaxError>;
