// 🗄️ Record Store - durable storage + overlap queries for tax rate records
//
// Append-only: there is an insert, there are reads, nothing else. The SQLite
// store keeps one connection behind a mutex, so a completed insert is visible
// to every query issued after it.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::TaxResult;
use crate::record::{RecordId, TaxRateRecord};

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Storage contract the resolver reads through.
///
/// `query_overlapping` must return records ordered by granularity (most
/// specific first) and, within one granularity, by insertion order.
pub trait RecordStore: Send + Sync {
    /// Validate and append one record.
    fn insert(&self, record: &TaxRateRecord) -> TaxResult<RecordId>;

    /// Every record for the jurisdiction, in insertion order. Empty when the
    /// jurisdiction is unknown.
    fn query_all(&self, jurisdiction: &str) -> TaxResult<Vec<TaxRateRecord>>;

    /// Records for the jurisdiction whose closed range contains `date`.
    fn query_overlapping(
        &self,
        jurisdiction: &str,
        date: NaiveDate,
    ) -> TaxResult<Vec<TaxRateRecord>>;

    /// Every record of every jurisdiction, in insertion order.
    fn list_all(&self) -> TaxResult<Vec<TaxRateRecord>>;
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> TaxResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tax_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            municipality TEXT NOT NULL,
            period_type INTEGER NOT NULL CHECK (period_type BETWEEN 1 AND 4),
            date_start TEXT NOT NULL,
            date_end TEXT NOT NULL,
            tax_rate REAL NOT NULL CHECK (tax_rate >= 0),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tax_records_lookup
         ON tax_records(municipality, period_type)",
        [],
    )?;

    Ok(())
}

const SELECT_COLUMNS: &str =
    "SELECT municipality, period_type, date_start, date_end, tax_rate FROM tax_records";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TaxRateRecord> {
    Ok(TaxRateRecord {
        jurisdiction: row.get(0)?,
        granularity: row.get(1)?,
        valid_from: row.get(2)?,
        valid_to: row.get(3)?,
        rate: row.get(4)?,
    })
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) a file-backed store with WAL journaling.
    pub fn open(path: &Path) -> TaxResult<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for crash recovery
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened tax record database");

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> TaxResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> TaxResult<Self> {
        setup_database(&conn)?;
        Ok(SqliteRecordStore {
            conn: Mutex::new(conn),
        })
    }

    /// Drop every record and recreate the schema.
    pub fn reset(&self) -> TaxResult<()> {
        let conn = self.conn.lock()?;
        conn.execute("DROP TABLE IF EXISTS tax_records", [])?;
        setup_database(&conn)?;
        info!("tax_records table reset");
        Ok(())
    }

    pub fn count(&self) -> TaxResult<i64> {
        let conn = self.conn.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM tax_records", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: &TaxRateRecord) -> TaxResult<RecordId> {
        record.validate()?;

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO tax_records (municipality, period_type, date_start, date_end, tax_rate)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.jurisdiction,
                record.granularity,
                record.valid_from,
                record.valid_to,
                record.rate,
            ],
        )?;
        let id = RecordId(conn.last_insert_rowid());

        debug!(
            %id,
            municipality = %record.jurisdiction,
            period_type = record.granularity.rank(),
            "inserted tax rate record"
        );
        Ok(id)
    }

    fn query_all(&self, jurisdiction: &str) -> TaxResult<Vec<TaxRateRecord>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE municipality = ?1 ORDER BY id",
            SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map([jurisdiction], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn query_overlapping(
        &self,
        jurisdiction: &str,
        date: NaiveDate,
    ) -> TaxResult<Vec<TaxRateRecord>> {
        let conn = self.conn.lock()?;
        // Dates are stored as ISO text; validated years keep text order == date order.
        let mut stmt = conn.prepare(&format!(
            "{} WHERE municipality = ?1 AND date_start <= ?2 AND date_end >= ?2
             ORDER BY period_type ASC, id ASC",
            SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![jurisdiction, date], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn list_all(&self) -> TaxResult<Vec<TaxRateRecord>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;

        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
