use std::sync::{Arc, Mutex};
use std::time::Duration;

use alt_text_batch::*;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct CapturedRequest {
    call: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: Value,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

async fn generate_content(
    State(state): State<StubState>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(CapturedRequest {
        call,
        api_key,
        body,
    });
    (state.status, Json(state.reply.clone()))
}

async fn png_image() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], b"png-bytes".to_vec())
}

async fn missing_image() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "gone")
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Start a stub API answering every `generateContent` call with `reply`.
async fn stub(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        reply,
        requests: requests.clone(),
    };
    let app = Router::new()
        .route("/v1beta/models/:call", post(generate_content))
        .route("/images/photo.png", get(png_image))
        .route("/images/missing.png", get(missing_image))
        .with_state(state);
    (serve(app).await, requests)
}

fn config(endpoint: &str) -> AltTextConfig {
    AltTextConfig::with_api_key("test-key")
        .endpoint(endpoint)
        .model("test-model")
        .timeout(Duration::from_secs(5))
}

fn image() -> EncodedImage {
    EncodedImage {
        data: "aGVsbG8=".to_string(),
        mime_type: "image/jpeg".to_string(),
    }
}

fn candidates(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
}

// -- Captioning client --

#[tokio::test]
async fn test_caption_sends_prompt_and_inline_image() {
    let (endpoint, requests) = stub(StatusCode::OK, candidates("A cat asleep in the sun.")).await;
    let captioner = GeminiCaptioner::new(reqwest::Client::new(), config(&endpoint)).unwrap();

    let text = captioner.caption(&image()).await.unwrap();
    assert_eq!(text, "A cat asleep in the sun.");

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.call, "test-model:generateContent");
    assert_eq!(req.api_key.as_deref(), Some("test-key"));

    let contents = req.body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[0]["parts"][0]["text"], ALT_TEXT_PROMPT);
    assert_eq!(contents[0]["parts"][1]["inline_data"]["mime_type"], "image/jpeg");
    assert_eq!(contents[0]["parts"][1]["inline_data"]["data"], "aGVsbG8=");
}

#[tokio::test]
async fn test_caption_api_error_carries_server_message() {
    let (endpoint, _) = stub(
        StatusCode::BAD_REQUEST,
        json!({ "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" } }),
    )
    .await;
    let captioner = GeminiCaptioner::new(reqwest::Client::new(), config(&endpoint)).unwrap();

    match captioner.caption(&image()).await {
        Err(AltTextError::ApiError { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_caption_error_payload_with_ok_status() {
    let (endpoint, _) = stub(
        StatusCode::OK,
        json!({ "error": { "code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED" } }),
    )
    .await;
    let captioner = GeminiCaptioner::new(reqwest::Client::new(), config(&endpoint)).unwrap();

    match captioner.caption(&image()).await {
        Err(AltTextError::ApiError { status, message }) => {
            assert_eq!(status, 200);
            assert_eq!(message, "Resource exhausted");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_caption_without_candidates_is_empty_completion() {
    let (endpoint, _) = stub(StatusCode::OK, json!({ "candidates": [] })).await;
    let captioner = GeminiCaptioner::new(reqwest::Client::new(), config(&endpoint)).unwrap();

    assert!(matches!(
        captioner.caption(&image()).await,
        Err(AltTextError::EmptyCompletion)
    ));
}

#[tokio::test]
async fn test_caption_unreachable_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let captioner = GeminiCaptioner::new(reqwest::Client::new(), config(&endpoint)).unwrap();
    assert!(matches!(
        captioner.caption(&image()).await,
        Err(AltTextError::Connection { .. })
    ));
}

// -- Remote fetch --

#[tokio::test]
async fn test_fetch_reads_body_and_content_type() {
    let (endpoint, _) = stub(StatusCode::OK, candidates("unused")).await;
    let fetcher = HttpFetcher::new(reqwest::Client::new(), Duration::from_secs(5));

    let fetched = fetcher
        .fetch(&format!("{}/images/photo.png", endpoint))
        .await
        .unwrap();
    assert_eq!(fetched.content_type.as_deref(), Some("image/png"));
    assert_eq!(fetched.bytes, b"png-bytes");
}

#[tokio::test]
async fn test_fetch_non_success_is_fetch_failed() {
    let (endpoint, _) = stub(StatusCode::OK, candidates("unused")).await;
    let fetcher = HttpFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
    let url = format!("{}/images/missing.png", endpoint);

    match fetcher.fetch(&url).await {
        Err(AltTextError::FetchFailed { url: failed, reason }) => {
            assert_eq!(failed, url);
            assert!(reason.contains("404"));
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
}

// -- End to end --

#[tokio::test]
async fn test_orchestrator_over_http() {
    let (endpoint, requests) = stub(StatusCode::OK, candidates("A red kite over a beach.")).await;
    let orch = Orchestrator::from_config(config(&endpoint)).unwrap();

    orch.add_files(vec![FileUpload::new("kite.jpg", "image/jpeg", b"jpeg".to_vec())])
        .unwrap();
    orch.add_url_record(&format!("{}/images/photo.png", endpoint))
        .unwrap();
    orch.add_url_record(&format!("{}/images/missing.png", endpoint))
        .unwrap();

    let summary = orch.process_batch().await.unwrap();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let records = orch.snapshot();
    assert_eq!(records[0].alt_text.as_deref(), Some("A red kite over a beach."));
    assert_eq!(records[1].mime_type.as_deref(), Some("image/png"));
    assert!(records[2].status_error.as_deref().unwrap().contains("404"));

    let mimes: Vec<Value> = requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.body["contents"][0]["parts"][1]["inline_data"]["mime_type"].clone())
        .collect();
    assert_eq!(mimes, vec![json!("image/jpeg"), json!("image/png")]);

    let csv = orch.export_csv().unwrap();
    assert_eq!(csv.lines().count(), 3);
}
