//! mmtl-gateway library
//!
//! HTTP gateway for the multimessenger timeline: proxies CSV uploads to the
//! external correlation service, ingests correlated results, serves the
//! stored collections, and gates the admin surface behind a signed session
//! cookie.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use mmtl_common::db::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod correlator;
pub mod error;

use api::auth::AuthSettings;
use config::GatewayConfig;
use correlator::{CorrelatorClient, CorrelatorError};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Lazily connected store
    pub db: Database,
    pub correlator: CorrelatorClient,
    pub auth: Arc<AuthSettings>,
    /// Server startup time, reported by /health
    pub startup_time: DateTime<Utc>,
    /// Largest accepted request body
    pub upload_limit_bytes: usize,
}

impl AppState {
    pub fn new(
        db: Database,
        correlator: CorrelatorClient,
        auth: AuthSettings,
        upload_limit_bytes: usize,
    ) -> Self {
        Self {
            db,
            correlator,
            auth: Arc::new(auth),
            startup_time: Utc::now(),
            upload_limit_bytes,
        }
    }

    /// Build state from resolved configuration; the database is not contacted
    pub fn from_config(config: &GatewayConfig) -> Result<Self, CorrelatorError> {
        Ok(Self::new(
            Database::new(Some(config.database_url.clone()), config.max_connections),
            CorrelatorClient::new(&config.correlator)?,
            AuthSettings::from_config(&config.auth),
            config.upload_limit_bytes,
        ))
    }
}

/// Build application router
///
/// - `/api/submit`, `/api/save-correlated`: session required, 401 otherwise
/// - `/dashboard`: session required, redirect to `/admin` otherwise
/// - everything else is public
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected_api = Router::new()
        .route("/api/submit", post(api::submit))
        .route("/api/save-correlated", post(api::save_correlated))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_api_session,
        ));

    let protected_pages = Router::new()
        .route("/dashboard", get(api::serve_dashboard))
        .route("/dashboard/*rest", get(api::serve_dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_page_session,
        ));

    let public = Router::new()
        .route("/", get(api::serve_landing))
        .route("/admin", get(api::serve_admin))
        .route("/api/auth", post(api::login))
        .route("/api/logout", post(api::logout))
        .route("/api/correlated", get(api::list_correlated))
        .route("/api/getalldata", get(api::list_all_events))
        .route("/api/getalldatagw", get(api::list_gw_events))
        .merge(api::health_routes());

    Router::new()
        .merge(protected_api)
        .merge(protected_pages)
        .merge(public)
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
