//! Terminal search over the classifier store.
//!
//! Prints places matching `--obj` and, with `--street`, the matching streets
//! of each place as an indented tree.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kladr::config::Config;
use kladr::{Resolver, SledStore};

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Search places and streets by name")]
struct Args {
    /// Place name or LIKE pattern
    #[arg(long)]
    obj: String,

    /// Street name or LIKE pattern
    #[arg(long)]
    street: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// sled database directory (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so they never mix with results
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.storage.path = db;
    }

    let store = SledStore::open(&config.storage.path).context("Failed to open sled store")?;
    let resolver = Resolver::new(store);

    let places = resolver.search(&args.obj, None)?;
    let street = args.street.as_deref().filter(|s| !s.trim().is_empty());

    let mut out = io::stdout().lock();
    for place in places.iter() {
        writeln!(out, "{} {}", place.name, place.kind)?;
        if let Some(street) = street {
            for found in resolver.search_streets(&place.id, street)? {
                writeln!(out, "|-- {} {}", found.name, found.kind)?;
            }
        }
    }

    Ok(())
}
