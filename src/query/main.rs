//! Query server for the address classifier.
//!
//! Exposes region listing, code resolution and name search over HTTP as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kladr::config::Config;
use kladr::store::Table;
use kladr::{Resolver, SledStore};

mod handlers;
use handlers::{router, AppState, DynStore};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Address classifier query server")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// sled database directory (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(db) = args.db {
        config.storage.path = db;
    }

    info!("Kladr Query Server");

    let store = SledStore::open(&config.storage.path).context("Failed to open sled store")?;
    info!(
        "Store has {} places and {} streets",
        store.len(Table::Places),
        store.len(Table::Streets)
    );
    if store.is_empty() {
        warn!("Store is empty. Load data with the ingest binary first.");
    }

    let store: DynStore = Box::new(store);
    let state = Arc::new(AppState {
        resolver: Resolver::new(store),
    });
    let app = router(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
