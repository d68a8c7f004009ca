//! mmtl-import - bulk load raw event CSVs
//!
//! Every row is validated before anything is written; the first invalid row
//! aborts the import with its row number.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mmtl_common::config::{default_data_dir, sqlite_url_for};
use mmtl_common::db::{open_pool, raw_events, DEFAULT_MAX_CONNECTIONS};
use mmtl_common::ingest::parse_strict_csv;
use mmtl_common::{RawAllEvent, RawGwEvent};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Gravitational-wave detections (raw_gw_events)
    Gw,
    /// Fully populated GW/GRB pairs (raw_all_events)
    All,
}

#[derive(Parser, Debug)]
#[command(name = "mmtl-import")]
#[command(about = "Import raw event CSVs into the MMTL database")]
#[command(version)]
struct Args {
    /// Record type contained in the file
    #[arg(short, long, value_enum)]
    kind: Kind,

    /// CSV file to import
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mmtl_import=info,mmtl_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let input = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let database_url = args.database_url.unwrap_or_else(|| {
        let dir = default_data_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("Could not create {}: {}", dir.display(), e);
        }
        sqlite_url_for(&dir.join("mmtl.db"))
    });

    // Validate the whole file before touching the database
    let count = match args.kind {
        Kind::Gw => {
            let events: Vec<RawGwEvent> = parse_strict_csv(&input)
                .with_context(|| format!("Invalid GW event file {}", args.file.display()))?;
            let pool = open_pool(&database_url, DEFAULT_MAX_CONNECTIONS)
                .await
                .context("Failed to open database")?;
            raw_events::insert_gw_events(&pool, &events).await?
        }
        Kind::All => {
            let events: Vec<RawAllEvent> = parse_strict_csv(&input)
                .with_context(|| format!("Invalid GW/GRB pair file {}", args.file.display()))?;
            let pool = open_pool(&database_url, DEFAULT_MAX_CONNECTIONS)
                .await
                .context("Failed to open database")?;
            raw_events::insert_all_events(&pool, &events).await?
        }
    };

    info!("Imported {} rows from {}", count, args.file.display());
    Ok(())
}
