// In-memory record store
//
// Same contract as the SQLite store, expressed as a linear scan with the
// closed-interval predicate plus a stable sort by granularity. Insertion order
// is the vector order, so the stable sort keeps the first-inserted record
// ahead of later ones with the same granularity.

use chrono::NaiveDate;
use std::sync::RwLock;
use tracing::debug;

use crate::db::RecordStore;
use crate::error::TaxResult;
use crate::record::{RecordId, TaxRateRecord};

#[derive(Default)]
pub struct InMemoryRecordStore {
    /// Append-only, never mutated in place
    records: RwLock<Vec<(RecordId, TaxRateRecord)>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> TaxResult<usize> {
        Ok(self.records.read()?.len())
    }

    pub fn is_empty(&self) -> TaxResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: &TaxRateRecord) -> TaxResult<RecordId> {
        record.validate()?;

        let mut records = self.records.write()?;
        let id = RecordId(records.last().map_or(1, |(last, _)| last.0 + 1));
        records.push((id, record.clone()));

        debug!(%id, municipality = %record.jurisdiction, "inserted tax rate record (memory)");
        Ok(id)
    }

    fn query_all(&self, jurisdiction: &str) -> TaxResult<Vec<TaxRateRecord>> {
        let records = self.records.read()?;
        Ok(records
            .iter()
            .filter(|(_, r)| r.jurisdiction == jurisdiction)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn query_overlapping(
        &self,
        jurisdiction: &str,
        date: NaiveDate,
    ) -> TaxResult<Vec<TaxRateRecord>> {
        let records = self.records.read()?;
        let mut hits: Vec<TaxRateRecord> = records
            .iter()
            .filter(|(_, r)| r.jurisdiction == jurisdiction && r.covers(date))
            .map(|(_, r)| r.clone())
            .collect();

        hits.sort_by_key(|r| r.granularity);
        Ok(hits)
    }

    fn list_all(&self) -> TaxResult<Vec<TaxRateRecord>> {
        let records = self.records.read()?;
        Ok(records.iter().map(|(_, r)| r.clone()).collect())
    }
}
