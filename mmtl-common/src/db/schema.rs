//! Table definitions
//!
//! Each collection stores its record as a JSON document plus the columns
//! needed for lookups. Creation is idempotent.

use sqlx::SqlitePool;
use tracing::info;

use crate::Result;

pub const RAW_GW_EVENTS: &str = "raw_gw_events";
pub const RAW_ALL_EVENTS: &str = "raw_all_events";
pub const CORRELATED_RESULTS: &str = "correlated_results";

/// Create all tables and indexes if missing
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_gw_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_all_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            gw_event_id TEXT NOT NULL,
            grb_event_id TEXT NOT NULL,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // gw_event_id / grb_event_id are nullable: the correlated schema is
    // non-strict and rows need not name both events
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS correlated_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            gw_event_id TEXT,
            grb_event_id TEXT,
            document TEXT NOT NULL,
            extra_fields TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_correlated_pair ON correlated_results (gw_event_id, grb_event_id)",
    )
    .execute(pool)
    .await?;

    info!("Database tables initialized (raw_gw_events, raw_all_events, correlated_results)");
    Ok(())
}
