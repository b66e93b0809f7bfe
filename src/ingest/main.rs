//! Classifier ingest pipeline.
//!
//! Reads the place and street exports (CSV with `name`, `socr` and `code`
//! columns) and loads them into the sled store used by the query server.

mod rows;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kladr::config::Config;
use kladr::store::Table;
use kladr::SledStore;

use crate::rows::{count_records, load_rows, LoadStats};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Load classifier exports into the sled store")]
struct Args {
    /// Place export (regions, areas, cities, settlements)
    #[arg(long)]
    places: Option<PathBuf>,

    /// Street export
    #[arg(long)]
    streets: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// sled database directory (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Field delimiter of the exports
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Drop existing rows of a table before loading it
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    if args.places.is_none() && args.streets.is_none() {
        bail!("Nothing to load: pass --places and/or --streets");
    }
    if !args.delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character");
    }
    let delimiter = args.delimiter as u8;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.storage.path = db;
    }

    info!("Kladr Ingest");
    info!("Store: {}", config.storage.path.display());

    let store = SledStore::open(&config.storage.path).context("Failed to open sled store")?;

    for (table, path) in [(Table::Places, &args.places), (Table::Streets, &args.streets)] {
        let Some(path) = path else { continue };
        if args.clear {
            info!("Clearing table {}", table.name());
            store.clear(table)?;
        }
        let stats = ingest_file(&store, table, path, delimiter)?;
        info!(
            "Table {}: loaded {} rows, skipped {}",
            table.name(),
            stats.loaded,
            stats.skipped
        );
    }

    let flushed = store.flush()?;
    info!("Flushed {} bytes", flushed);
    info!(
        "Store now has {} places and {} streets",
        store.len(Table::Places),
        store.len(Table::Streets)
    );

    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn ingest_file(store: &SledStore, table: Table, path: &Path, delimiter: u8) -> Result<LoadStats> {
    info!("Counting rows in {}...", path.display());
    let total_count = count_records(open(path)?, delimiter)?;
    info!("Found {} rows", total_count);

    let pb = ProgressBar::new(total_count);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let stats = load_rows(open(path)?, delimiter, table, |object| {
        store.upsert(table, &object)?;
        pb.inc(1);
        Ok(())
    })?;

    pb.finish_with_message("Processing complete");
    Ok(stats)
}
