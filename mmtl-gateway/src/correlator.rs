//! External correlation service client
//!
//! Forwards uploaded CSV files as one multipart request (every part under the
//! field name `files`) and classifies the reply by its content type. Transport
//! failures (connect, timeout) are retried with exponential backoff; a non-2xx
//! answer is never retried.

use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CorrelatorConfig;

const USER_AGENT: &str = concat!("mmtl-gateway/", env!("CARGO_PKG_VERSION"));
const INITIAL_BACKOFF_MS: u64 = 250;

/// Field name every forwarded file part is sent under
pub const FORWARD_FIELD: &str = "files";

/// Correlator client errors
#[derive(Debug, Error)]
pub enum CorrelatorError {
    #[error("Correlation service error")]
    Status(u16),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Decode(String),

    #[error("Failed to build correlator client: {0}")]
    Client(String),
}

/// A file part received from the browser
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    fn to_part(&self) -> Part {
        let part = || Part::bytes(self.data.to_vec()).file_name(self.file_name.clone());
        match self.content_type.as_deref() {
            Some(content_type) => part().mime_str(content_type).unwrap_or_else(|e| {
                debug!(content_type, error = %e, "Dropping unparseable part content type");
                part()
            }),
            None => part(),
        }
    }
}

/// Correlator reply, classified by content type
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelatorReply {
    /// `multipart/*`: relayed byte for byte with its original content type
    Multipart { content_type: String, body: Bytes },
    Json(serde_json::Value),
    Csv(String),
    /// Anything else, relayed as text
    Text(String),
}

impl CorrelatorReply {
    /// Classify a successful upstream body
    pub fn classify(content_type: &str, body: Bytes) -> Result<Self, CorrelatorError> {
        let lowered = content_type.to_ascii_lowercase();
        if lowered.starts_with("multipart/") {
            Ok(CorrelatorReply::Multipart {
                content_type: content_type.to_string(),
                body,
            })
        } else if lowered.contains("application/json") {
            serde_json::from_slice(&body)
                .map(CorrelatorReply::Json)
                .map_err(|e| CorrelatorError::Decode(format!("Invalid JSON from correlation service: {}", e)))
        } else if lowered.contains("text/csv") {
            Ok(CorrelatorReply::Csv(String::from_utf8_lossy(&body).into_owned()))
        } else {
            Ok(CorrelatorReply::Text(String::from_utf8_lossy(&body).into_owned()))
        }
    }
}

impl IntoResponse for CorrelatorReply {
    fn into_response(self) -> Response {
        match self {
            CorrelatorReply::Multipart { content_type, body } => {
                match HeaderValue::from_str(&content_type) {
                    Ok(value) => (StatusCode::OK, [(header::CONTENT_TYPE, value)], body).into_response(),
                    Err(_) => (StatusCode::OK, body).into_response(),
                }
            }
            CorrelatorReply::Json(value) => Json(value).into_response(),
            CorrelatorReply::Csv(text) => {
                (StatusCode::OK, [(header::CONTENT_TYPE, "text/csv")], text).into_response()
            }
            CorrelatorReply::Text(text) => (StatusCode::OK, text).into_response(),
        }
    }
}

/// Client for the correlation service
#[derive(Debug, Clone)]
pub struct CorrelatorClient {
    http_client: reqwest::Client,
    url: String,
    max_retries: u32,
}

impl CorrelatorClient {
    pub fn new(config: &CorrelatorConfig) -> Result<Self, CorrelatorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| CorrelatorError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `files` to the correlator and classify its reply
    pub async fn correlate(&self, files: &[UploadedFile]) -> Result<CorrelatorReply, CorrelatorError> {
        let response = self.send_with_retry(files).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %self.url, "Correlation service returned an error status");
            return Err(CorrelatorError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| CorrelatorError::Transport(e.to_string()))?;

        info!(
            content_type = %content_type,
            bytes = body.len(),
            "Correlation service replied"
        );
        CorrelatorReply::classify(&content_type, body)
    }

    async fn send_with_retry(&self, files: &[UploadedFile]) -> Result<reqwest::Response, CorrelatorError> {
        let mut attempt = 0u32;
        loop {
            // Form is not Clone; rebuild per attempt
            let form = files
                .iter()
                .fold(Form::new(), |form, file| form.part(FORWARD_FIELD, file.to_part()));

            match self.http_client.post(&self.url).multipart(form).send().await {
                Ok(response) => return Ok(response),
                Err(e) if is_transient(&e) && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Correlation service unreachable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(CorrelatorError::Transport(e.to_string())),
            }
        }
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(1u64 << attempt.min(16)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_multipart_keeps_header() {
        let ct = "multipart/mixed; boundary=abc";
        let reply = CorrelatorReply::classify(ct, Bytes::from_static(b"--abc--")).unwrap();
        assert_eq!(
            reply,
            CorrelatorReply::Multipart {
                content_type: ct.to_string(),
                body: Bytes::from_static(b"--abc--"),
            }
        );
    }

    #[test]
    fn test_classify_json() {
        let reply =
            CorrelatorReply::classify("application/json; charset=utf-8", Bytes::from_static(b"{\"n\":2}"))
                .unwrap();
        assert_eq!(reply, CorrelatorReply::Json(serde_json::json!({"n": 2})));
    }

    #[test]
    fn test_classify_bad_json_is_decode_error() {
        let err = CorrelatorReply::classify("application/json", Bytes::from_static(b"{oops")).unwrap_err();
        assert!(matches!(err, CorrelatorError::Decode(_)));
    }

    #[test]
    fn test_classify_csv_and_fallback() {
        assert_eq!(
            CorrelatorReply::classify("text/csv", Bytes::from_static(b"a,b\n")).unwrap(),
            CorrelatorReply::Csv("a,b\n".to_string())
        );
        assert_eq!(
            CorrelatorReply::classify("", Bytes::from_static(b"hello")).unwrap(),
            CorrelatorReply::Text("hello".to_string())
        );
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(250));
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client = CorrelatorClient::new(&CorrelatorConfig {
            url: "http://127.0.0.1:9/correlate".to_string(),
            timeout: Duration::from_secs(2),
            max_retries: 0,
        })
        .unwrap();
        let files = vec![UploadedFile {
            file_name: "a.csv".to_string(),
            content_type: Some("text/csv".to_string()),
            data: Bytes::from_static(b"x\n1\n"),
        }];
        let err = client.correlate(&files).await.unwrap_err();
        assert!(matches!(err, CorrelatorError::Transport(_)));
    }
}
