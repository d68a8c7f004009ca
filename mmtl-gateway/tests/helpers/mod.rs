//! Test Helper Utilities
//!
//! Shared utilities for testing mmtl-gateway

#![allow(dead_code)]

pub mod fake_correlator;
pub mod multipart;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use mmtl_common::config::sqlite_url_for;
use mmtl_common::db::Database;
use mmtl_gateway::api::auth::AuthSettings;
use mmtl_gateway::config::{AuthConfig, CorrelatorConfig};
use mmtl_gateway::correlator::CorrelatorClient;
use mmtl_gateway::{build_router, AppState};

pub use fake_correlator::{spawn_fake_correlator, CapturedPart, FakeCorrelator};
pub use multipart::MultipartBody;

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "s3cret";
pub const TEST_SECRET: &str = "integration-test-secret";

/// Port 9 (discard) is closed on test hosts
pub const UNREACHABLE_CORRELATOR: &str = "http://127.0.0.1:9/correlate";

/// Router plus the state behind it; the temp dir lives as long as the app
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// `Cookie` header value carrying a freshly issued session
    pub fn session_cookie(&self) -> String {
        let token = self.state.auth.signer().issue(Utc::now()).unwrap();
        format!("admin_auth={}", token.value)
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        enabled: true,
        username: Some(TEST_USERNAME.to_string()),
        password: Some(TEST_PASSWORD.to_string()),
        session_secret: Some(TEST_SECRET.to_string()),
        cookie_http_only: false,
    }
}

fn correlator(url: &str) -> CorrelatorClient {
    CorrelatorClient::new(&CorrelatorConfig {
        url: url.to_string(),
        timeout: Duration::from_secs(5),
        max_retries: 0,
    })
    .unwrap()
}

/// App backed by a fresh SQLite file
pub fn test_app_with(correlator_url: &str, auth: AuthConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(Some(sqlite_url_for(&dir.path().join("test.db"))), 1);
    let state = AppState::new(
        db,
        correlator(correlator_url),
        AuthSettings::from_config(&auth),
        10 * 1024 * 1024,
    );
    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: Some(dir),
    }
}

pub fn test_app(correlator_url: &str) -> TestApp {
    test_app_with(correlator_url, auth_config())
}

/// App whose database can never connect
pub fn test_app_without_database() -> TestApp {
    let state = AppState::new(
        Database::new(None, 1),
        correlator(UNREACHABLE_CORRELATOR),
        AuthSettings::from_config(&auth_config()),
        10 * 1024 * 1024,
    );
    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: None,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart POST, with an optional session cookie
pub fn post_multipart(uri: &str, form: MultipartBody, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, form.content_type());
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.into_bytes())).unwrap()
}

pub async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

/// Upload `csv` to /api/save-correlated with a valid session
pub async fn save_csv(app: &TestApp, uri: &str, csv: &str) -> Response<Body> {
    let form = MultipartBody::new().file("file", "results.csv", "text/csv", csv.as_bytes());
    let cookie = app.session_cookie();
    app.send(post_multipart(uri, form, Some(&cookie))).await
}
