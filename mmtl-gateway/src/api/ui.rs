//! UI serving routes
//!
//! Embedded pages: a landing page, the admin login form, and the dashboard
//! table backed by /api/correlated.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::AppState;

const LANDING_HTML: &str = include_str!("../ui/landing.html");
const ADMIN_HTML: &str = include_str!("../ui/admin.html");
const DASHBOARD_HTML: &str = include_str!("../ui/dashboard.html");

/// GET /
pub async fn serve_landing() -> Html<&'static str> {
    Html(LANDING_HTML)
}

/// GET /admin
///
/// Visitors who already hold a session are sent to `/`.
pub async fn serve_admin(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.auth.enabled && state.auth.has_valid_session(&headers) {
        return Redirect::to("/").into_response();
    }
    Html(ADMIN_HTML).into_response()
}

/// GET /dashboard
pub async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}
