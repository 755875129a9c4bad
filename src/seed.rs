// 🌱 Seeding + CSV import
//
// The default catalog is the Copenhagen/Aarhus 2024 set the service ships
// with. CSV files use the same column names as the JSON wire shape.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::db::RecordStore;
use crate::error::TaxResult;
use crate::record::{parse_date, Granularity, TaxRateRecord};

/// Default seed catalog.
pub fn default_records() -> TaxResult<Vec<TaxRateRecord>> {
    let seeds = [
        ("Copenhagen", Granularity::Yearly, "2024-01-01", "2024-12-31", 0.2),
        ("Copenhagen", Granularity::Monthly, "2024-05-01", "2024-05-31", 0.4),
        ("Copenhagen", Granularity::Daily, "2024-01-01", "2024-01-01", 0.1),
        ("Copenhagen", Granularity::Daily, "2024-12-25", "2024-12-25", 0.1),
        ("Aarhus", Granularity::Yearly, "2024-01-01", "2024-12-31", 0.5),
    ];

    seeds
        .iter()
        .map(|&(municipality, granularity, from, to, rate)| -> TaxResult<TaxRateRecord> {
            Ok(TaxRateRecord::new(
                municipality,
                granularity,
                parse_date(from)?,
                parse_date(to)?,
                rate,
            ))
        })
        .collect()
}

/// Insert the default catalog. Returns how many records were written.
pub fn seed_defaults<S: RecordStore + ?Sized>(store: &S) -> TaxResult<usize> {
    let records = default_records()?;
    for record in &records {
        store.insert(record)?;
    }
    info!(count = records.len(), "seeded default tax records");
    Ok(records.len())
}

/// Read records from a CSV file with header
/// `municipality,period_type,date_start,date_end,tax_rate`.
pub fn load_csv(csv_path: &Path) -> Result<Vec<TaxRateRecord>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_csv(file)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TaxRateRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        // +2: header is line 1
        let record: TaxRateRecord =
            result.with_context(|| format!("Failed to deserialize record on line {}", index + 2))?;
        records.push(record);
    }

    Ok(records)
}

/// Insert records one at a time. Each insert stands alone; the first failure
/// stops the import and earlier rows stay stored.
pub fn import_records<S: RecordStore + ?Sized>(
    store: &S,
    records: &[TaxRateRecord],
) -> Result<usize> {
    let mut inserted = 0;

    for (index, record) in records.iter().enumerate() {
        if let Err(e) = store.insert(record) {
            warn!(inserted, row = index + 1, error = %e, "import stopped");
            return Err(e).with_context(|| {
                format!(
                    "Failed to import record {} ({}), {} records already stored",
                    index + 1,
                    record.jurisdiction,
                    inserted
                )
            });
        }
        inserted += 1;
    }

    info!(inserted, "imported tax records");
    Ok(inserted)
}
