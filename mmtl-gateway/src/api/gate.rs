//! Protected-surface middleware
//!
//! Mutating APIs answer 401 without a session; pages redirect to the login
//! page instead. Both pass everything through when auth is disabled.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Login page unauthenticated page requests are sent to
pub const LOGIN_PATH: &str = "/admin";

/// Session check for protected API routes
pub async fn require_api_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.auth.permits(request.headers()) {
        return Ok(next.run(request).await);
    }

    warn!(path = %request.uri().path(), "Rejected unauthenticated API request");
    Err(ApiError::Unauthorized("Authentication required".to_string()))
}

/// Session check for protected pages
pub async fn require_page_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.auth.permits(request.headers()) {
        return next.run(request).await;
    }

    debug!(path = %request.uri().path(), "Redirecting unauthenticated visitor to login");
    Redirect::to(LOGIN_PATH).into_response()
}
