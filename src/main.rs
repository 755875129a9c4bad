use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use municipal_tax::{
    import_records, init_tracing, load_csv, parse_date, Granularity, RateResolver, RecordStore,
    StoreConfig, TaxRateRecord,
};

/// Municipal tax rates: store, import and resolve
#[derive(Parser, Debug)]
#[command(name = "municipal-tax", version, about)]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database (combine with --reset / --seed)
    Init,
    /// Import records from a CSV file
    Import { csv: PathBuf },
    /// List records, optionally for one municipality
    List { municipality: Option<String> },
    /// Resolve the applicable rate for a municipality on a date (YYYY-MM-DD)
    Resolve { municipality: String, date: String },
    /// Add one record. period_type: 1=daily 2=weekly 3=monthly 4=yearly
    Add {
        municipality: String,
        period_type: u8,
        date_start: String,
        date_end: String,
        tax_rate: f64,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = cli
        .store
        .open_store()
        .with_context(|| format!("Failed to open database {:?}", cli.store.db_path))?;
    let resolver = RateResolver::new(store);

    match cli.command {
        Command::Init => {
            println!("✓ Database ready: {} records", resolver.store().count()?);
        }
        Command::Import { csv } => {
            let records = load_csv(&csv)?;
            println!("✓ Loaded {} records from {}", records.len(), csv.display());
            let inserted = import_records(resolver.store(), &records)?;
            println!("✓ Inserted: {} records", inserted);
        }
        Command::List { municipality } => {
            let records = match municipality {
                Some(name) => resolver.resolve_all_for_jurisdiction(&name)?,
                None => resolver.store().list_all()?,
            };
            for record in &records {
                print_record(record);
            }
            println!("{} records", records.len());
        }
        Command::Resolve { municipality, date } => {
            let date = parse_date(&date)?;
            match resolver.try_resolve(&municipality, date)? {
                Some(record) => print_record(&record),
                None => println!("No tax rate for {} on {}", municipality, date),
            }
        }
        Command::Add {
            municipality,
            period_type,
            date_start,
            date_end,
            tax_rate,
        } => {
            let record = TaxRateRecord::new(
                municipality,
                Granularity::try_from(period_type)?,
                parse_date(&date_start)?,
                parse_date(&date_end)?,
                tax_rate,
            );
            let id = resolver.store().insert(&record)?;
            println!("✓ Stored record {}", id);
        }
    }

    Ok(())
}

fn print_record(record: &TaxRateRecord) {
    println!(
        "{:<16} {:<8} {} → {}  {}",
        record.jurisdiction, record.granularity, record.valid_from, record.valid_to, record.rate
    );
}
