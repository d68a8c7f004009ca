//! Correlation proxy
//!
//! POST /api/submit forwards the uploaded CSV files to the correlation
//! service and relays its reply. Nothing is persisted here.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use super::multipart_error;
use crate::correlator::UploadedFile;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Minimum number of file parts a submission needs
pub const MIN_FILES: usize = 2;

/// POST /api/submit
///
/// Every part carrying a filename is forwarded regardless of its field
/// name; plain form fields are ignored.
pub async fn submit(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            debug!(field = ?field.name(), "Skipping non-file form field");
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        files.push(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.len() < MIN_FILES {
        return Err(ApiError::BadRequest(
            "At least two CSV files are required".to_string(),
        ));
    }

    info!(
        files = files.len(),
        url = %state.correlator.url(),
        "Forwarding upload to correlation service"
    );
    let reply = state.correlator.correlate(&files).await?;
    Ok(reply.into_response())
}
