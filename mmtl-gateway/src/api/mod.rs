//! HTTP API handlers for mmtl-gateway

pub mod auth;
pub mod collections;
pub mod gate;
pub mod health;
pub mod ingest;
pub mod submit;
pub mod ui;

pub use auth::{login, logout};
pub use collections::{list_all_events, list_correlated, list_gw_events};
pub use gate::{require_api_session, require_page_session};
pub use health::health_routes;
pub use ingest::save_correlated;
pub use submit::submit;
pub use ui::{serve_admin, serve_dashboard, serve_landing};

use axum::extract::multipart::MultipartError;

use crate::error::ApiError;

/// Map a failure while reading multipart fields
pub(crate) fn multipart_error(e: MultipartError) -> ApiError {
    if e.status().is_client_error() {
        ApiError::BadRequest(e.body_text())
    } else {
        ApiError::Internal(e.body_text())
    }
}
