// ⚖️ Rate Resolver - picks the one applicable rate for (jurisdiction, date)
//
// Overlapping periods are expected: a yearly default plus monthly, weekly or
// daily exceptions. The most specific period covering the date wins
// (Daily > Weekly > Monthly > Yearly). Among records with the same
// granularity the first inserted wins; that order comes from the store.

use chrono::NaiveDate;
use tracing::debug;

use crate::db::RecordStore;
use crate::error::{TaxError, TaxResult};
use crate::record::TaxRateRecord;

pub struct RateResolver<S> {
    store: S,
}

impl<S: RecordStore> RateResolver<S> {
    pub fn new(store: S) -> Self {
        RateResolver { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the applicable record, or `TaxError::NotFound` when no record
    /// of the jurisdiction covers the date.
    pub fn resolve(&self, jurisdiction: &str, date: NaiveDate) -> TaxResult<TaxRateRecord> {
        let candidates = self.store.query_overlapping(jurisdiction, date)?;
        let candidate_count = candidates.len();

        let winner = candidates
            .into_iter()
            .next()
            .ok_or_else(|| TaxError::NotFound {
                jurisdiction: jurisdiction.to_string(),
                date,
            })?;

        debug!(
            municipality = jurisdiction,
            %date,
            candidates = candidate_count,
            period_type = winner.granularity.rank(),
            rate = winner.rate,
            "resolved tax rate"
        );
        Ok(winner)
    }

    /// Like `resolve`, but `NotFound` becomes `None`.
    pub fn try_resolve(
        &self,
        jurisdiction: &str,
        date: NaiveDate,
    ) -> TaxResult<Option<TaxRateRecord>> {
        match self.resolve(jurisdiction, date) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Full catalog for the jurisdiction, no precedence applied.
    pub fn resolve_all_for_jurisdiction(&self, jurisdiction: &str) -> TaxResult<Vec<TaxRateRecord>> {
        self.store.query_all(jurisdiction)
    }
}
