//! Correlated result collection

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use tracing::info;
use uuid::Uuid;

use crate::models::{CorrelatedFields, CorrelatedResult, StoredCorrelated};
use crate::{Error, Result};

/// How a batch treats rows whose (gw_event_id, grb_event_id) pair already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Always insert; repeated uploads produce duplicate rows
    #[default]
    Append,
    /// Replace stored rows with the same pair; within one batch the last
    /// occurrence of a pair wins. Rows missing either id are appended.
    ReplacePair,
}

/// Insert a batch in one transaction and return the stored rows
pub async fn insert_batch(
    pool: &SqlitePool,
    rows: Vec<CorrelatedResult>,
    mode: InsertMode,
) -> Result<Vec<StoredCorrelated>> {
    let rows = match mode {
        InsertMode::Append => rows,
        InsertMode::ReplacePair => last_per_pair(rows),
    };

    let batch_id = Uuid::new_v4();
    let created_at = Utc::now();
    let created_at_text = created_at.to_rfc3339();
    let batch_text = batch_id.to_string();

    let mut tx = pool.begin().await?;
    let mut replaced = 0u64;
    let mut stored = Vec::with_capacity(rows.len());

    for result in rows {
        if mode == InsertMode::ReplacePair {
            if let Some((gw, grb)) = result.pair_key() {
                replaced += sqlx::query(
                    "DELETE FROM correlated_results WHERE gw_event_id = ? AND grb_event_id = ?",
                )
                .bind(gw)
                .bind(grb)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            }
        }

        let document = serde_json::to_string(&result.fields)?;
        let extra_fields = serde_json::to_string(&result.additional_fields)?;

        let id = sqlx::query(
            r#"
            INSERT INTO correlated_results
                (batch_id, gw_event_id, grb_event_id, document, extra_fields, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&batch_text)
        .bind(result.fields.gw_event_id.as_deref())
        .bind(result.fields.grb_event_id.as_deref())
        .bind(&document)
        .bind(&extra_fields)
        .bind(&created_at_text)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        stored.push(StoredCorrelated {
            id,
            batch_id,
            created_at,
            result,
        });
    }

    tx.commit().await?;

    info!(
        batch_id = %batch_id,
        inserted = stored.len(),
        replaced,
        "Stored correlated results"
    );
    Ok(stored)
}

fn last_per_pair(rows: Vec<CorrelatedResult>) -> Vec<CorrelatedResult> {
    let mut last_index: HashMap<(String, String), usize> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        if let Some((gw, grb)) = row.pair_key() {
            last_index.insert((gw.to_string(), grb.to_string()), index);
        }
    }

    rows.into_iter()
        .enumerate()
        .filter(|(index, row)| match row.pair_key() {
            Some((gw, grb)) => last_index.get(&(gw.to_string(), grb.to_string())) == Some(index),
            None => true,
        })
        .map(|(_, row)| row)
        .collect()
}

type CorrelatedRow = (i64, String, String, String, String);

const SELECT_COLUMNS: &str =
    "SELECT id, batch_id, document, extra_fields, created_at FROM correlated_results";

fn decode_row((id, batch_id, document, extra_fields, created_at): CorrelatedRow) -> Result<StoredCorrelated> {
    let batch_id = Uuid::parse_str(&batch_id)
        .map_err(|e| Error::Internal(format!("Invalid batch_id on row {}: {}", id, e)))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Invalid created_at on row {}: {}", id, e)))?
        .with_timezone(&Utc);
    let fields: CorrelatedFields = serde_json::from_str(&document)?;
    let additional_fields: BTreeMap<String, String> = serde_json::from_str(&extra_fields)?;

    Ok(StoredCorrelated {
        id,
        batch_id,
        created_at,
        result: CorrelatedResult {
            fields,
            additional_fields,
        },
    })
}

/// Every stored row
pub async fn fetch_all(pool: &SqlitePool) -> Result<Vec<StoredCorrelated>> {
    let rows: Vec<CorrelatedRow> = sqlx::query_as(&format!("{} ORDER BY id", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(decode_row).collect()
}

/// One page of stored rows
pub async fn fetch_page(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<StoredCorrelated>> {
    let rows: Vec<CorrelatedRow> =
        sqlx::query_as(&format!("{} ORDER BY id LIMIT ? OFFSET ?", SELECT_COLUMNS))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
    rows.into_iter().map(decode_row).collect()
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM correlated_results")
        .fetch_one(pool)
        .await?;
    Ok(total)
}
