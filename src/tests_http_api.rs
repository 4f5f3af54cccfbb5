// End-to-end tests that drive the router in-process

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

use crate::config::{RootPolicy, ServerConfig};
use crate::http::{router, AppState, SearchResponse};
use crate::search::engine::{EngineError, EngineExit, MatchEngine};
use crate::search::{SearchLimits, SearchPipeline, SearchResult};

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("foo.txt"), b"hello world\n").unwrap();
    fs::create_dir_all(dir.path().join(".hidden")).unwrap();
    fs::write(dir.path().join(".hidden").join("skip.txt"), b"secret").unwrap();
    dir
}

fn config_for(root: &Path) -> ServerConfig {
    ServerConfig::for_root(fs::canonicalize(root).unwrap())
}

fn app(root: &Path) -> Router {
    router(AppState::new(config_for(root)))
}

fn search_request(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn search_json(app: Router, body: &str) -> (StatusCode, SearchResponse) {
    let response = app.oneshot(search_request(body)).await.unwrap();
    let status = response.status();
    let bytes = body_bytes(response).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_search_finds_visible_file() {
    let dir = fixture();
    let (status, response) = search_json(app(dir.path()), r#"{"query":"foo"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.error, None);
    assert_eq!(
        response.results,
        vec![SearchResult {
            path: "foo.txt".to_string(),
            filename: "foo.txt".to_string(),
            size: 12,
        }]
    );
}

#[tokio::test]
async fn test_search_response_shape() {
    let dir = fixture();
    let response = app(dir.path())
        .oneshot(search_request(r#"{"query":"foo"}"#))
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();

    assert_eq!(
        value,
        serde_json::json!({
            "results": [{"path": "foo.txt", "filename": "foo.txt", "size": 12}]
        })
    );
}

#[tokio::test]
async fn test_search_hidden_files_never_match() {
    let dir = fixture();
    let (_, response) = search_json(app(dir.path()), r#"{"query":"skip"}"#).await;
    assert!(response.results.is_empty());
    assert_eq!(response.error, None);
}

#[tokio::test]
async fn test_search_explicit_base_dir() {
    let dir = fixture();
    let other = TempDir::new().unwrap();
    fs::create_dir_all(other.path().join("docs")).unwrap();
    fs::write(other.path().join("docs").join("notes.md"), b"# notes").unwrap();

    let body = serde_json::json!({
        "query": "notes",
        "baseDir": other.path().to_str().unwrap(),
    })
    .to_string();
    let (status, response) = search_json(app(dir.path()), &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].path, "docs/notes.md");
    assert_eq!(response.results[0].filename, "notes.md");
    assert_eq!(response.results[0].size, 7);
}

#[tokio::test]
async fn test_search_missing_base_dir_is_reported_in_body() {
    let dir = fixture();
    let (status, response) = search_json(
        app(dir.path()),
        r#"{"query":"x","baseDir":"/does/not/exist"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(response.results.is_empty());
    let error = response.error.unwrap();
    assert!(error.contains("/does/not/exist"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_search_blank_query_returns_nothing() {
    let dir = fixture();
    let (status, response) = search_json(app(dir.path()), r#"{"query":"   "}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.results.is_empty());
    assert_eq!(response.error, None);
}

#[tokio::test]
async fn test_search_malformed_body_is_bad_request() {
    let dir = fixture();
    let response = app(dir.path())
        .oneshot(search_request("{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_overlong_query_is_bad_request() {
    let dir = fixture();
    let body = serde_json::json!({ "query": "a".repeat(501) }).to_string();
    let response = app(dir.path()).oneshot(search_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_requires_post() {
    let dir = fixture();
    let response = app(dir.path()).oneshot(get("/api/search")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_search_confined_root_rejects_outside_dir() {
    let dir = fixture();
    let mut config = config_for(dir.path());
    config.root_policy = RootPolicy::Confined;

    let (status, response) = search_json(
        router(AppState::new(config)),
        r#"{"query":"passwd","baseDir":"/etc"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.results.is_empty());
    assert!(response.error.unwrap().starts_with("Access denied"));
}

struct RejectingEngine;

impl MatchEngine for RejectingEngine {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn run(
        &self,
        _query: &str,
        _input: mpsc::Receiver<String>,
        _output: mpsc::Sender<String>,
    ) -> Result<EngineExit, EngineError> {
        Err(EngineError::Aborted("unknown option".to_string()))
    }
}

#[tokio::test]
async fn test_search_engine_failure_is_surfaced() {
    let dir = fixture();
    let pipeline = SearchPipeline::new(Arc::new(RejectingEngine), SearchLimits::default());
    let app = router(AppState::with_pipeline(config_for(dir.path()), pipeline));

    let (status, response) = search_json(app, r#"{"query":"foo"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.results.is_empty());
    assert!(response.error.unwrap().contains("unknown option"));
}

#[tokio::test]
async fn test_download_traversal_is_forbidden() {
    let dir = fixture();
    let response = app(dir.path())
        .oneshot(get("/api/download?file=../../etc/passwd&dir=/data/project"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_sibling_prefix_is_forbidden() {
    let parent = TempDir::new().unwrap();
    let root = parent.path().join("data");
    fs::create_dir_all(&root).unwrap();
    fs::create_dir_all(parent.path().join("database")).unwrap();
    fs::write(parent.path().join("database").join("secret"), b"x").unwrap();

    let uri = format!(
        "/api/download?file=../database/secret&dir={}",
        urlencoding::encode(root.to_str().unwrap())
    );
    let response = app(&root).oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_missing_file_param() {
    let dir = fixture();
    let response = app(dir.path())
        .oneshot(get("/api/download?dir=/tmp"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(dir.path())
        .oneshot(get("/api/download?file="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_nonexistent_file() {
    let dir = fixture();
    let response = app(dir.path())
        .oneshot(get("/api/download?file=nope.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_directory_is_not_found() {
    let dir = fixture();
    fs::create_dir_all(dir.path().join("sub")).unwrap();
    let response = app(dir.path())
        .oneshot(get("/api/download?file=sub"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_serves_attachment() {
    let dir = fixture();
    let uri = format!(
        "/api/download?file=foo.txt&dir={}",
        urlencoding::encode(dir.path().to_str().unwrap())
    );
    let response = app(dir.path()).oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_LENGTH], "12");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"foo.txt\"; filename*=UTF-8''foo.txt"
    );
    assert_eq!(body_bytes(response).await, b"hello world\n");
}

#[tokio::test]
async fn test_download_defaults_to_configured_root() {
    let dir = fixture();
    let response = app(dir.path())
        .oneshot(get("/api/download?file=foo.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"hello world\n");
}

#[tokio::test]
async fn test_index_shows_default_root() {
    let dir = fixture();
    let root = fs::canonicalize(dir.path()).unwrap();
    let response = app(dir.path()).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let page = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(page.contains(&format!("value=\"{}\"", root.display())));
}

#[tokio::test]
async fn test_static_assets_are_confined() {
    let dir = fixture();
    let assets = TempDir::new().unwrap();
    fs::write(assets.path().join("app.css"), b"body{}").unwrap();

    let mut config = config_for(dir.path());
    config.static_dir = fs::canonicalize(assets.path()).unwrap();
    let app = router(AppState::new(config));

    let response = app.clone().oneshot(get("/static/app.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/css; charset=utf-8"
    );
    assert_eq!(body_bytes(response).await, b"body{}");

    let response = app.clone().oneshot(get("/static/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/static/../foo.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
