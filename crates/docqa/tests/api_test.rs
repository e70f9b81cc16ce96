//! HTTP API tests against the full router with offline providers.
//!
//! Each test builds state over a temporary upload directory, a mock
//! embedder, an in-memory vector store and a canned LLM.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use docqa::config::RagConfig;
use docqa::providers::mock::{MockEmbedder, MockLlm};
use docqa::providers::LlmProvider;
use docqa::server::{router, state::AppState};
use docqa::storage::MemoryVectorStore;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn test_config(upload_dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.files.upload_directory = upload_dir.to_path_buf();
    config.chunking.chunk_size = 500;
    config.chunking.chunk_overlap = 50;
    config
}

fn app_with_llm(dir: &TempDir, llm: Option<Arc<dyn LlmProvider>>) -> Router {
    let state = AppState::with_providers(
        test_config(dir.path()),
        Arc::new(MockEmbedder::new(128)),
        Arc::new(MemoryVectorStore::new()),
        llm,
    )
    .unwrap();
    router(state)
}

fn app(dir: &TempDir) -> Router {
    app_with_llm(dir, Some(Arc::new(MockLlm::new("The answer is 42."))))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(filename: &str, content: &str) -> Request<Body> {
    let boundary = "docqa-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{f}\"\r\n\
         Content-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempdir().unwrap();
    let (status, body) = send(&app(&dir), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_root_welcome() {
    let dir = tempdir().unwrap();
    let (status, body) = send(&app(&dir), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Document QA Agent");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_sync_then_query() {
    // 1. Files dropped straight into the upload directory
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("handbook.txt"),
        "Employees receive 25 vacation days per year. Requests go to your manager.",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.md"), "# Notes\n\nThe office closes at 6pm.").unwrap();
    std::fs::write(dir.path().join("empty.csv"), "name,role\n").unwrap();
    std::fs::write(dir.path().join("photo.png"), [0u8, 1, 2]).unwrap();
    let app = app(&dir);

    // 2. First sync ingests the supported files
    let (status, body) = send(&app, post("/sync/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["total_files_in_folder"], 3);
    assert_eq!(body["new_files_processed"], 2);
    assert_eq!(body["already_processed"], 0);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["failed_files"][0]["file"], "empty.csv");
    assert_eq!(body["failed_files"][0]["error"], "No documents extracted");

    // 3. Second sync finds nothing new
    let (_, body) = send(&app, post("/sync")).await;
    assert_eq!(body["new_files_processed"], 0);
    assert_eq!(body["already_processed"], 2);

    // 4. Status reflects the ledger
    let (status, body) = send(&app, get("/sync/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 3);
    assert_eq!(body["processed_count"], 2);
    assert_eq!(body["pending_count"], 1);
    assert_eq!(body["pending_files"][0]["filename"], "empty.csv");

    // 5. Query returns the canned answer with sources
    let (status, body) = send(
        &app,
        post_json("/query/", serde_json::json!({"question": "How many vacation days?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "The answer is 42.");
    let sources = body["sources"].as_array().unwrap();
    assert!(!sources.is_empty() && sources.len() <= 4);
    assert!(sources
        .iter()
        .any(|s| s["source"].as_str().unwrap().ends_with("handbook.txt")));
    assert!(body["processing_time"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_query_long_source_is_truncated() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("long.txt"), "lorem ipsum ".repeat(30)).unwrap();
    let app = app(&dir);
    send(&app, post("/sync/")).await;

    let (_, body) = send(
        &app,
        post_json("/query", serde_json::json!({"question": "lorem"})),
    )
    .await;
    let content = body["sources"][0]["content"].as_str().unwrap();
    assert!(content.ends_with("..."));
    assert_eq!(content.chars().count(), 203);
}

#[tokio::test]
async fn test_query_without_agent_is_unavailable() {
    let dir = tempdir().unwrap();
    let app = app_with_llm(&dir, None);

    let (status, body) = send(
        &app,
        post_json("/query/", serde_json::json!({"question": "anything"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "agent_unavailable");

    let (status, _) = send(&app, post("/clear_memory/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_blank_question_is_bad_request() {
    let dir = tempdir().unwrap();
    let (status, body) = send(
        &app(&dir),
        post_json("/query/", serde_json::json!({"question": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "bad_request");
}

#[tokio::test]
async fn test_clear_memory() {
    let dir = tempdir().unwrap();
    let (status, body) = send(&app(&dir), post("/clear_memory/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Conversation memory cleared");
}

#[tokio::test]
async fn test_upload_ingests_in_background() {
    let dir = tempdir().unwrap();
    let app = app(&dir);

    let request = upload("../guide.txt", "The guide explains onboarding.");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Files uploaded and processing started");
    let saved = body["files"][0].as_str().unwrap();
    assert!(saved.ends_with("guide.txt"));
    assert!(dir.path().join("guide.txt").exists());

    // Background ingestion records the file in the ledger
    let mut processed = 0;
    for _ in 0..50 {
        let (_, status) = send(&app, get("/sync/status")).await;
        processed = status["processed_count"].as_u64().unwrap();
        if processed == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(processed, 1);
}

#[tokio::test]
async fn test_upload_without_files_rejected() {
    let dir = tempdir().unwrap();
    let boundary = "empty-boundary";
    let request = Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(format!("--{}--\r\n", boundary)))
        .unwrap();

    let (status, _) = send(&app(&dir), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_file_stats_and_cleanup() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("fresh.txt"), "new").unwrap();
    let old = dir.path().join("old.txt");
    std::fs::write(&old, "old").unwrap();
    let long_ago = std::time::SystemTime::now() - Duration::from_secs(40 * 86_400);
    std::fs::File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(long_ago)
        .unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, get("/files/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_files"], 2);
    assert_eq!(body["files_by_age"]["0-7_days"], 1);
    assert_eq!(body["files_by_age"]["30+_days"], 1);
    assert_eq!(body["retention_days"], 30);

    let (status, body) = send(&app, post("/files/cleanup")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_files"].as_array().unwrap().len(), 1);
    assert!(!old.exists());
    assert!(dir.path().join("fresh.txt").exists());
}

#[tokio::test]
async fn test_upload_cannot_replace_ledger() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "Alpha team meets on Mondays.").unwrap();
    let app = app(&dir);

    let (_, body) = send(&app, post("/sync/")).await;
    assert_eq!(body["new_files_processed"], 1);
    let ledger = std::fs::read_to_string(dir.path().join(".processed_files.json")).unwrap();

    let (status, body) = send(&app, upload(".processed_files.json", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "bad_request");
    let (status, _) = send(&app, upload("../.processed_files.json", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(
        std::fs::read_to_string(dir.path().join(".processed_files.json")).unwrap(),
        ledger
    );
    let (_, body) = send(&app, post("/sync/")).await;
    assert_eq!(body["new_files_processed"], 0);
    assert_eq!(body["already_processed"], 1);
}
