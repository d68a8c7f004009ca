//! Admin login and logout
//!
//! Credentials are compared verbatim against the configured admin username
//! and password. A match sets the `admin_auth` cookie to a signed, expiring
//! token; logout only asks the browser to drop it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use mmtl_common::session::{
    cleared_session_cookie, cookie_value, session_cookie, SessionSigner, SESSION_COOKIE,
};

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Runtime authentication settings
pub struct AuthSettings {
    pub enabled: bool,
    username: Option<String>,
    password: Option<String>,
    signer: SessionSigner,
    cookie_http_only: bool,
}

impl AuthSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        let signer = match config.session_secret.as_deref() {
            Some(secret) => SessionSigner::new(secret),
            None => {
                warn!("MMTL_SESSION_SECRET not set; using a random secret, sessions will not survive a restart");
                SessionSigner::random()
            }
        };

        if config.enabled && (config.username.is_none() || config.password.is_none()) {
            warn!("Admin credentials not configured; every login attempt will be rejected");
        }
        if !config.enabled {
            warn!("Authentication disabled; protected routes are open");
        }

        Self {
            enabled: config.enabled,
            username: config.username.clone(),
            password: config.password.clone(),
            signer,
            cookie_http_only: config.cookie_http_only,
        }
    }

    /// Exact match against both configured credentials; unconfigured never matches
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => u == username && p == password,
            _ => false,
        }
    }

    /// True when any `Cookie` header carries a valid, unexpired session token
    pub fn has_valid_session(&self, headers: &HeaderMap) -> bool {
        let now = Utc::now();
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| cookie_value(value, SESSION_COOKIE))
            .any(|token| match self.signer.verify(token, now) {
                Ok(_) => true,
                Err(e) => {
                    debug!(reason = %e, "Rejected session cookie");
                    false
                }
            })
    }

    /// True when the request may reach a protected route
    pub fn permits(&self, headers: &HeaderMap) -> bool {
        !self.enabled || self.has_valid_session(headers)
    }

    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }
}

/// Login request body; absent fields never match
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/auth
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let matched = match (request.username.as_deref(), request.password.as_deref()) {
        (Some(username), Some(password)) => state.auth.credentials_match(username, password),
        _ => false,
    };
    if !matched {
        warn!("Rejected admin login");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state
        .auth
        .signer()
        .issue(Utc::now())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let cookie = session_cookie(
        &token.value,
        state.auth.signer().ttl_secs(),
        state.auth.cookie_http_only,
    );
    let cookie = HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(expires_at = %token.expires_at, "Admin session issued");
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "success": true }))).into_response())
}

/// POST /api/logout
pub async fn logout() -> ApiResult<Response> {
    let cookie = HeaderValue::from_str(&cleared_session_cookie())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "success": true }))).into_response())
}
