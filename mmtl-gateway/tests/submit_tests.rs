//! Integration tests for the correlation proxy (POST /api/submit)

mod helpers;

use axum::http::{header, StatusCode};
use serde_json::json;

use helpers::*;

const GW_CSV: &[u8] = b"event_id,source,event_type,utc_time\nGW170817,LIGO,BNS,2017-08-17 12:41:04\n";
const GRB_CSV: &[u8] = b"event_id,source,utc_time\nbn170817529,Fermi,2017-08-17 12:41:06\n";

fn two_files() -> MultipartBody {
    MultipartBody::new()
        .file("file1", "a.csv", "text/csv", GW_CSV)
        .file("file2", "b.csv", "text/csv", GRB_CSV)
}

#[tokio::test]
async fn test_fewer_than_two_files_rejected_without_upstream_call() {
    let fake = spawn_fake_correlator(StatusCode::OK, "text/csv", b"x\n").await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let one_file = MultipartBody::new()
        .file("file1", "a.csv", "text/csv", GW_CSV)
        .text("note", "only one");
    let response = app
        .send(post_multipart("/api/submit", one_file, Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("At least two"));
    assert_eq!(fake.hits(), 0);
}

#[tokio::test]
async fn test_files_forwarded_under_files_field_and_csv_relayed() {
    let reply: &'static [u8] = b"rank,gw_event_id,grb_event_id\n1,GW170817,bn170817529\n";
    let fake = spawn_fake_correlator(StatusCode::OK, "text/csv; charset=utf-8", reply).await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let response = app
        .send(post_multipart("/api/submit", two_files(), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(body_bytes(response.into_body()).await, reply);

    let parts = fake.parts();
    assert_eq!(fake.hits(), 1);
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|p| p.field == "files"));
    assert_eq!(parts[0].file_name.as_deref(), Some("a.csv"));
    assert_eq!(parts[1].file_name.as_deref(), Some("b.csv"));
    assert_eq!(parts[0].data, GW_CSV);
    assert_eq!(parts[1].content_type.as_deref(), Some("text/csv"));
}

#[tokio::test]
async fn test_additional_files_forwarded() {
    let fake = spawn_fake_correlator(StatusCode::OK, "text/csv", b"x\n").await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let form = two_files().file("extra", "c.csv", "text/csv", b"event_id\nX\n");
    let response = app
        .send(post_multipart("/api/submit", form, Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fake.parts().len(), 3);
}

#[tokio::test]
async fn test_json_reply_reencoded() {
    let fake = spawn_fake_correlator(
        StatusCode::OK,
        "application/json",
        br#"{"matches": [{"gw_event_id": "GW170817", "confidence_score": 0.97}]}"#,
    )
    .await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let response = app
        .send(post_multipart("/api/submit", two_files(), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!({"matches": [{"gw_event_id": "GW170817", "confidence_score": 0.97}]})
    );
}

#[tokio::test]
async fn test_multipart_reply_relayed_byte_for_byte() {
    let content_type = "multipart/mixed; boundary=corr";
    let reply: &'static [u8] =
        b"--corr\r\nContent-Type: text/csv\r\n\r\na,b\r\n--corr\r\nContent-Type: application/json\r\n\r\n{}\r\n--corr--\r\n";
    let fake = spawn_fake_correlator(StatusCode::OK, content_type, reply).await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let response = app
        .send(post_multipart("/api/submit", two_files(), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], content_type);
    assert_eq!(body_bytes(response.into_body()).await, reply);
}

#[tokio::test]
async fn test_unknown_reply_relayed_as_text() {
    let fake = spawn_fake_correlator(StatusCode::OK, "application/octet-stream", b"opaque").await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let response = app
        .send(post_multipart("/api/submit", two_files(), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"opaque");
}

#[tokio::test]
async fn test_upstream_error_status_is_500() {
    let fake = spawn_fake_correlator(StatusCode::BAD_GATEWAY, "text/plain", b"boom").await;
    let app = test_app(&fake.url);
    let cookie = app.session_cookie();

    let response = app
        .send(post_multipart("/api/submit", two_files(), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({"success": false, "error": "Correlation service error"}));
    assert_eq!(fake.hits(), 1);
}

#[tokio::test]
async fn test_unreachable_correlator_is_500_with_message() {
    let app = test_app(UNREACHABLE_CORRELATOR);
    let cookie = app.session_cookie();

    let response = app
        .send(post_multipart("/api/submit", two_files(), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let app = test_app(UNREACHABLE_CORRELATOR);
    let mut request = post_json("/api/submit", &json!({"files": []}));
    request
        .headers_mut()
        .insert(header::COOKIE, app.session_cookie().parse().unwrap());

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
