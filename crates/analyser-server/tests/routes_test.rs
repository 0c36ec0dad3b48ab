//! Route behaviour against a mock provider

use analyser_server::{router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use s3_analyser::protocol::mock::MockProvider;
use s3_analyser::AnalyserConfig;
use std::sync::Arc;
use tower::ServiceExt;

fn state() -> (AppState, tempfile::TempDir) {
    let provider = MockProvider::new();
    provider.add_bucket("hm.samples", "us-east-1", None);
    provider.add_metric("us-east-1", "hm.samples", "NumberOfObjects", "AllStorageTypes", Some(4.0));
    provider.add_metric("us-east-1", "hm.samples", "BucketSizeBytes", "AllStorageTypes", Some(24.0));
    provider.add_metric("us-east-1", "hm.samples", "BucketSizeBytes", "StandardStorage", Some(24.0));

    let dir = tempfile::tempdir().unwrap();
    let mut config = AnalyserConfig::default();
    config.export.text_file = dir.path().join("s3-metrics.prom");

    let provider = Arc::new(provider);
    let state = AppState::new(provider.clone(), provider, "t0k3n", config);
    (state, dir)
}

async fn get(state: AppState, uri: &str, accept: Option<&str>) -> (StatusCode, String, String) {
    let mut request = Request::builder().uri(uri);
    if let Some(accept) = accept {
        request = request.header(header::ACCEPT, accept);
    }
    let response = router(state)
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn missing_or_wrong_token_is_unauthorized() {
    let (state, _dir) = state();
    assert_eq!(get(state.clone(), "/", None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(get(state, "/?token=nope", None).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn favicon_is_not_found() {
    let (state, _dir) = state();
    let (status, _, _) = get(state, "/favicon.ico?token=t0k3n", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forbidden_characters_are_rejected() {
    let (state, _dir) = state();
    let (status, _, _) = get(state.clone(), "/?token=t0k3n&prefix=s3://a%3Brm", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(state, "/?token=t0k3n&unit=M%20B", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn echo_returns_command_without_running() {
    let (state, dir) = state();
    let (status, _, body) = get(
        state.clone(),
        "/?token=t0k3n&unit=KB&prefix=s3://hm.*&conc=2&echo",
        Some("text/csv"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "s3-analyser --fmt \"csv\" --unit \"KB\" --prefix \"s3://hm.*\" --conc \"2\""
    );
    assert!(!dir.path().join("s3-metrics.prom").exists());
    assert!(!state.lock.is_busy());
}

#[tokio::test]
async fn busy_server_answers_conflict() {
    let (state, _dir) = state();
    let _running = state.lock.begin(Some(1), state.gauges.clone()).unwrap();

    let (status, _, body) = get(state, "/?token=t0k3n", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, "There is already an analysis running");
}

#[tokio::test]
async fn analysis_honours_accept_header() {
    let (state, dir) = state();

    let (status, content_type, body) = get(state.clone(), "/?token=t0k3n&unit=B", Some("text/csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/csv"));
    assert!(body.starts_with("Bucket,Region,Files,Total(B)"));
    assert!(body.contains("hm.samples,us-east-1,4,24,24,0,0"));

    let (_, content_type, body) = get(state.clone(), "/?token=t0k3n", None).await;
    assert_eq!(content_type, "application/json");
    assert!(body.starts_with("{\"Buckets\":["));

    let (_, _, body) = get(state.clone(), "/?token=t0k3n&pretty=1", None).await;
    assert!(body.contains("\n  \"Buckets\""));

    assert!(dir.path().join("s3-metrics.prom").exists());
    assert!(!state.lock.is_busy());
}

#[tokio::test]
async fn unmatched_prefix_is_bad_request() {
    let (state, _dir) = state();
    let (status, _, body) = get(state.clone(), "/?token=t0k3n&prefix=s3://nothing-*", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("nothing-*"));
    assert!(!state.lock.is_busy());
}
