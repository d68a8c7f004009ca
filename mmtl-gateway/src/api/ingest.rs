//! Correlated-results ingestion
//!
//! POST /api/save-correlated parses one CSV upload (field `file`) into
//! correlated results and stores the whole batch in a single transaction.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection,
        Multipart, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mmtl_common::db::correlated::{insert_batch, InsertMode};
use mmtl_common::ingest::parse_correlated_csv;
use mmtl_common::models::StoredCorrelated;

use super::multipart_error;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Multipart field holding the CSV
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct SaveQuery {
    /// Replace stored rows with the same (gw_event_id, grb_event_id) pair
    #[serde(default)]
    pub dedupe: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<StoredCorrelated>,
}

/// POST /api/save-correlated
pub async fn save_correlated(
    State(state): State<AppState>,
    query: Result<Query<SaveQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<SaveResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }
    let upload = upload.ok_or_else(|| {
        ApiError::BadRequest(format!("No CSV file uploaded (use '{}' field)", UPLOAD_FIELD))
    })?;

    let rows = match parse_correlated_csv(&upload) {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) => {
            warn!(bytes = upload.len(), "Uploaded CSV has no data rows");
            return Err(no_data());
        }
        Err(e) => {
            warn!(error = %e, "Uploaded CSV could not be parsed");
            return Err(no_data());
        }
    };

    let mode = if query.dedupe {
        InsertMode::ReplacePair
    } else {
        InsertMode::Append
    };

    state.db.connect().await;
    let pool = state.db.pool()?;
    let stored = insert_batch(&pool, rows, mode).await?;

    info!(count = stored.len(), ?mode, "Saved correlated upload");
    Ok(Json(SaveResponse {
        success: true,
        count: stored.len(),
        data: stored,
    }))
}

fn no_data() -> ApiError {
    ApiError::BadRequest("CSV parsing failed or no data found".to_string())
}
