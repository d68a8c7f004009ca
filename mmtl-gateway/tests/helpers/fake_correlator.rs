//! In-process stand-in for the correlation service
//!
//! Listens on an ephemeral port, records every multipart part it receives,
//! and answers with a fixed status, content type, and body.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    content_type: &'static str,
    body: &'static [u8],
    parts: Arc<Mutex<Vec<CapturedPart>>>,
    hits: Arc<AtomicUsize>,
}

pub struct FakeCorrelator {
    pub url: String,
    parts: Arc<Mutex<Vec<CapturedPart>>>,
    hits: Arc<AtomicUsize>,
}

impl FakeCorrelator {
    pub fn parts(&self) -> Vec<CapturedPart> {
        self.parts.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn correlate(State(reply): State<Reply>, mut multipart: Multipart) -> impl IntoResponse {
    reply.hits.fetch_add(1, Ordering::SeqCst);
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part = CapturedPart {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            data: field.bytes().await.unwrap().to_vec(),
        };
        reply.parts.lock().unwrap().push(part);
    }
    (
        reply.status,
        [(header::CONTENT_TYPE, reply.content_type)],
        reply.body,
    )
}

pub async fn spawn_fake_correlator(
    status: StatusCode,
    content_type: &'static str,
    body: &'static [u8],
) -> FakeCorrelator {
    let parts = Arc::new(Mutex::new(Vec::new()));
    let hits = Arc::new(AtomicUsize::new(0));
    let reply = Reply {
        status,
        content_type,
        body,
        parts: parts.clone(),
        hits: hits.clone(),
    };

    let app = Router::new()
        .route("/correlate", post(correlate))
        .with_state(reply);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeCorrelator {
        url: format!("http://{}/correlate", addr),
        parts,
        hits,
    }
}
