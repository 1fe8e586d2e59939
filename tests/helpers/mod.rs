//! In-process mock of the wine-label scan API.
//!
//! Serves the four endpoints the tool talks to (upload, poll, label fetch,
//! user-vintage fetch) on an ephemeral port, with configurable behavior per
//! test: upload status, a per-attempt poll plan, and resource bodies.

// Not every test file uses every helper.
#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scan_qa::models::task::{ImageSource, SubmissionTask};
use scan_qa::services::batch::{BatchOptions, PollPolicy};

/// Processing id the mock assigns to every accepted upload. Deliberately
/// non-numeric so the poll route and the label-fetch route can share a path.
pub const PROCESSING_ID: &str = "abc123";

pub struct MockState {
    /// HTTP status for the upload endpoint; 200 returns a processing id.
    pub upload_status: u16,
    /// Return 200 from upload but omit the processing_id field.
    pub upload_omits_processing_id: bool,
    /// Statuses returned for the first poll attempts (204 or an error
    /// status); once exhausted the mock answers 200 with `report`.
    pub poll_plan: Vec<u16>,
    /// Never leave the 204 "still processing" state.
    pub always_processing: bool,
    /// Artificial latency per poll, for concurrency observations.
    pub poll_latency_ms: u64,
    /// Terminal body for the poll endpoint.
    pub report: serde_json::Value,
    /// Body for the label-fetch endpoint; `None` answers 500.
    pub label: Option<serde_json::Value>,
    /// Body for the user-vintage endpoint; `None` answers 500.
    pub user_vintage: Option<serde_json::Value>,

    pub upload_count: AtomicUsize,
    pub poll_count: AtomicUsize,
    pub inflight_polls: AtomicUsize,
    pub max_inflight_polls: AtomicUsize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            upload_status: 200,
            upload_omits_processing_id: false,
            poll_plan: Vec::new(),
            always_processing: false,
            poll_latency_ms: 0,
            report: serde_json::json!({
                "id": 7,
                "upload_status": "Completed",
                "match_status": "Matched",
                "vintage_id": 42,
                "user_vintage_id": 11,
                "match_message": "Matched to vintage 42",
                "image": { "location": "//images.example.com/labels/7.jpg" }
            }),
            label: Some(serde_json::json!({
                "id": 7,
                "user_vintage_id": 11,
                "match_status": "Matched",
                "vintage_id": 42,
                "image": { "location": "//images.example.com/labels/7.jpg" }
            })),
            user_vintage: Some(serde_json::json!({
                "id": 11,
                "label_id": 7,
                "image": { "location": "//images.example.com/labels/7.jpg" }
            })),
            upload_count: AtomicUsize::new(0),
            poll_count: AtomicUsize::new(0),
            inflight_polls: AtomicUsize::new(0),
            max_inflight_polls: AtomicUsize::new(0),
        }
    }
}

/// Start the mock API on an ephemeral port; returns its base URL and the
/// shared state for counter assertions.
pub async fn spawn_mock_api(state: MockState) -> (String, Arc<MockState>) {
    let state = Arc::new(state);

    let app = Router::new()
        .route("/v/10.0.0/scans/label", post(upload_label))
        .route("/v/9.0.0/scans/v2/label/{id}", get(scan_or_label))
        .route("/v/9.1.1/user_vintages/{id}", get(user_vintage))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });

    (format!("http://{}", addr), state)
}

async fn upload_label(State(state): State<Arc<MockState>>) -> Response {
    state.upload_count.fetch_add(1, Ordering::SeqCst);

    if state.upload_status != 200 {
        let status = StatusCode::from_u16(state.upload_status).expect("mock upload status");
        return (status, "upload rejected").into_response();
    }

    if state.upload_omits_processing_id {
        return Json(serde_json::json!({})).into_response();
    }

    Json(serde_json::json!({ "processing_id": PROCESSING_ID })).into_response()
}

/// The poll endpoint and the label-fetch endpoint share a path on the real
/// API; the mock dispatches on whether the id is the processing handle.
async fn scan_or_label(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
) -> Response {
    if id == PROCESSING_ID {
        return poll_scan(&state).await;
    }

    match &state.label {
        Some(body) => Json(body.clone()).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "label fetch failed").into_response(),
    }
}

async fn poll_scan(state: &MockState) -> Response {
    let attempt = state.poll_count.fetch_add(1, Ordering::SeqCst);

    let inflight = state.inflight_polls.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_inflight_polls.fetch_max(inflight, Ordering::SeqCst);
    if state.poll_latency_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.poll_latency_ms)).await;
    }
    state.inflight_polls.fetch_sub(1, Ordering::SeqCst);

    if state.always_processing {
        return StatusCode::NO_CONTENT.into_response();
    }

    match state.poll_plan.get(attempt) {
        Some(204) => StatusCode::NO_CONTENT.into_response(),
        Some(&status) => {
            let status = StatusCode::from_u16(status).expect("mock poll status");
            (status, "transient failure").into_response()
        }
        None => Json(state.report.clone()).into_response(),
    }
}

async fn user_vintage(State(state): State<Arc<MockState>>, Path(_id): Path<String>) -> Response {
    match &state.user_vintage {
        Some(body) => Json(body.clone()).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "user_vintage fetch failed").into_response(),
    }
}

/// Write a small fake image to the temp dir and return its path.
pub fn temp_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scan_qa_{}_{}", std::process::id(), name));
    std::fs::write(&path, b"\xff\xd8\xff\xe0 fake jpeg bytes").expect("write temp image");
    path
}

/// A local-file task with no hint and no ground-truth.
pub fn local_task(path: PathBuf) -> SubmissionTask {
    SubmissionTask {
        image: ImageSource::Local(path),
        ocr_hint: None,
        run_label: "test".to_string(),
        expected_vintage_id: None,
        expected_wine_id: None,
    }
}

/// Batch options tuned for tests: short poll delay, small budget.
pub fn fast_options(concurrency: usize, max_attempts: u32) -> BatchOptions {
    BatchOptions {
        concurrency,
        poll: PollPolicy {
            delay: Duration::from_millis(5),
            max_attempts,
        },
    }
}
