// Municipal Tax - Core Library
// Temporal tax-rate resolution over overlapping daily/weekly/monthly/yearly periods.
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod record;
pub mod resolver;
pub mod seed;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{init_tracing, ServerConfig, StoreConfig};
pub use db::{setup_database, RecordStore, SqliteRecordStore};
pub use error::{TaxError, TaxResult};
pub use memory::InMemoryRecordStore;
pub use record::{parse_date, Granularity, RecordId, TaxRateRecord};
pub use resolver::RateResolver;
pub use seed::{default_records, import_records, load_csv, read_csv, seed_defaults};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
