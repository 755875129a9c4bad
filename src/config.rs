// Configuration shared by the CLI and the HTTP server
//
// Every option has an environment fallback so the server can be configured
// without flags in a container.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::db::SqliteRecordStore;
use crate::error::TaxResult;
use crate::seed::seed_defaults;

pub const DEFAULT_DB_PATH: &str = "tax_records.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Args, Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    #[arg(long = "db", env = "TAX_DB_PATH", default_value = DEFAULT_DB_PATH, global = true)]
    pub db_path: PathBuf,

    /// Drop and recreate the tax_records table before use
    #[arg(
        long,
        env = "TAX_DB_RESET",
        global = true,
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub reset: bool,

    /// Insert the default Copenhagen/Aarhus catalog after opening
    #[arg(
        long,
        env = "TAX_DB_SEED",
        global = true,
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub seed: bool,
}

impl StoreConfig {
    /// Open the store and apply `--reset` / `--seed`.
    pub fn open_store(&self) -> TaxResult<SqliteRecordStore> {
        let store = SqliteRecordStore::open(&self.db_path)?;

        if self.reset {
            store.reset()?;
        }
        if self.seed {
            seed_defaults(&store)?;
        }

        info!(
            path = %self.db_path.display(),
            records = store.count()?,
            "tax record store ready"
        );
        Ok(store)
    }
}

/// Tax rate HTTP server
#[derive(Parser, Debug, Clone)]
#[command(name = "tax-server", version, about)]
pub struct ServerConfig {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Address to listen on
    #[arg(long, env = "TAX_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,
}

/// Install the fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RecordStore;
    use std::sync::Mutex;

    // Tests touching TAX_DB_* variables hold this so parallel parses see a stable environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_server_config_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let config = ServerConfig::try_parse_from(["tax-server"]).unwrap();

        assert_eq!(config.bind, DEFAULT_BIND_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(config.store.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(!config.store.reset);
        assert!(!config.store.seed);
    }

    #[test]
    fn test_boolish_env_flags() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        std::env::set_var("TAX_DB_SEED", "1");
        std::env::set_var("TAX_DB_RESET", "yes");
        let enabled = ServerConfig::try_parse_from(["tax-server"]);
        std::env::set_var("TAX_DB_SEED", "0");
        std::env::set_var("TAX_DB_RESET", "off");
        let disabled = ServerConfig::try_parse_from(["tax-server"]);
        std::env::remove_var("TAX_DB_SEED");
        std::env::remove_var("TAX_DB_RESET");

        let enabled = enabled.unwrap();
        assert!(enabled.store.seed);
        assert!(enabled.store.reset);

        let disabled = disabled.unwrap();
        assert!(!disabled.store.seed);
        assert!(!disabled.store.reset);
    }

    #[test]
    fn test_server_config_flags() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let config = ServerConfig::try_parse_from([
            "tax-server",
            "--db",
            "/tmp/rates.db",
            "--bind",
            "127.0.0.1:9000",
            "--reset",
            "--seed",
        ])
        .unwrap();

        assert_eq!(config.store.db_path, PathBuf::from("/tmp/rates.db"));
        assert_eq!(config.bind.port(), 9000);
        assert!(config.store.reset && config.store.seed);

        assert!(ServerConfig::try_parse_from(["tax-server", "--bind", "not-an-addr"]).is_err());
    }

    #[test]
    fn test_open_store_reset_then_seed() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            db_path: dir.path().join("tax_records.db"),
            reset: true,
            seed: true,
        };

        // Opening twice with reset+seed must not duplicate the catalog
        config.open_store().unwrap();
        let store = config.open_store().unwrap();

        assert_eq!(store.count().unwrap(), 5);
        assert_eq!(store.query_all("Aarhus").unwrap().len(), 1);
    }
}
