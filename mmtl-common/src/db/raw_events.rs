//! Raw event collections
//!
//! Populated by the offline importer; the gateway only reads them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::schema::{RAW_ALL_EVENTS, RAW_GW_EVENTS};
use crate::models::{RawAllEvent, RawGwEvent, Stored};
use crate::Result;

/// Which raw table a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawCollection {
    GwEvents,
    AllEvents,
}

impl RawCollection {
    pub fn table(self) -> &'static str {
        match self {
            RawCollection::GwEvents => RAW_GW_EVENTS,
            RawCollection::AllEvents => RAW_ALL_EVENTS,
        }
    }
}

/// Insert GW events in one transaction, returning the number written
pub async fn insert_gw_events(pool: &SqlitePool, events: &[RawGwEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    for event in events {
        sqlx::query("INSERT INTO raw_gw_events (event_id, document) VALUES (?, ?)")
            .bind(&event.event_id)
            .bind(serde_json::to_string(event)?)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(count = events.len(), "Imported raw GW events");
    Ok(events.len())
}

/// Insert GW/GRB pairs in one transaction, returning the number written
pub async fn insert_all_events(pool: &SqlitePool, events: &[RawAllEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    for event in events {
        sqlx::query(
            "INSERT INTO raw_all_events (gw_event_id, grb_event_id, document) VALUES (?, ?, ?)",
        )
        .bind(&event.gw_event_id)
        .bind(&event.grb_event_id)
        .bind(serde_json::to_string(event)?)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(count = events.len(), "Imported raw GW/GRB pairs");
    Ok(events.len())
}

fn decode<T: DeserializeOwned>(rows: Vec<(i64, String)>) -> Result<Vec<Stored<T>>> {
    rows.into_iter()
        .map(|(id, document)| {
            Ok(Stored {
                id,
                record: serde_json::from_str(&document)?,
            })
        })
        .collect()
}

/// Every row of `collection`
pub async fn fetch_all<T>(pool: &SqlitePool, collection: RawCollection) -> Result<Vec<Stored<T>>>
where
    T: DeserializeOwned + Serialize,
{
    let sql = format!("SELECT id, document FROM {} ORDER BY id", collection.table());
    let rows: Vec<(i64, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;
    decode(rows)
}

/// One page of `collection`
pub async fn fetch_page<T>(
    pool: &SqlitePool,
    collection: RawCollection,
    limit: i64,
    offset: i64,
) -> Result<Vec<Stored<T>>>
where
    T: DeserializeOwned + Serialize,
{
    let sql = format!(
        "SELECT id, document FROM {} ORDER BY id LIMIT ? OFFSET ?",
        collection.table()
    );
    let rows: Vec<(i64, String)> = sqlx::query_as(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    decode(rows)
}

pub async fn count(pool: &SqlitePool, collection: RawCollection) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    let total: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(total)
}
