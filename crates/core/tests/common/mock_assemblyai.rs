use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

pub const API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct MockAssemblyAiConfig {
    /// Number of `processing` answers before the final transcript is returned.
    pub pending_polls: usize,
    pub final_transcript: Value,
    /// When set, every endpoint answers with this status instead.
    pub fail_with: Option<StatusCode>,
}

impl Default for MockAssemblyAiConfig {
    fn default() -> Self {
        Self {
            pending_polls: 0,
            final_transcript: json!({ "id": "tx_1", "status": "completed", "words": [] }),
            fail_with: None,
        }
    }
}

impl MockAssemblyAiConfig {
    pub fn pending_polls(mut self, pending_polls: usize) -> Self {
        self.pending_polls = pending_polls;
        self
    }

    pub fn final_transcript(mut self, final_transcript: Value) -> Self {
        self.final_transcript = final_transcript;
        self
    }

    pub fn fail_with(mut self, status: StatusCode) -> Self {
        self.fail_with = Some(status);
        self
    }
}

#[derive(Debug, Default)]
pub struct Captured {
    pub uploads: Vec<Vec<u8>>,
    pub transcript_requests: Vec<Value>,
    pub authorization: Vec<String>,
}

#[derive(Clone)]
struct MockState {
    config: MockAssemblyAiConfig,
    captured: Arc<Mutex<Captured>>,
    polls: Arc<AtomicUsize>,
}

pub struct MockAssemblyAi {
    pub base_url: String,
    pub captured: Arc<Mutex<Captured>>,
    polls: Arc<AtomicUsize>,
}

impl MockAssemblyAi {
    pub async fn start(config: MockAssemblyAiConfig) -> std::io::Result<Self> {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let polls = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            config,
            captured: captured.clone(),
            polls: polls.clone(),
        };

        let app = Router::new()
            .route("/v2/upload", post(upload))
            .route("/v2/transcript", post(create_transcript))
            .route("/v2/transcript/{id}", get(poll_transcript))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            captured,
            polls,
        })
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

fn record_auth(state: &MockState, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.captured.lock().unwrap().authorization.push(value);
}

fn failure(state: &MockState) -> Option<Response> {
    state
        .config
        .fail_with
        .map(|status| (status, Json(json!({ "error": "mock failure" }))).into_response())
}

async fn upload(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> Response {
    record_auth(&state, &headers);
    if let Some(resp) = failure(&state) {
        return resp;
    }

    state.captured.lock().unwrap().uploads.push(body.to_vec());
    Json(json!({ "upload_url": "https://cdn.assemblyai.test/upload/abc" })).into_response()
}

async fn create_transcript(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_auth(&state, &headers);
    if let Some(resp) = failure(&state) {
        return resp;
    }

    state.captured.lock().unwrap().transcript_requests.push(body);
    Json(json!({ "id": "tx_1", "status": "queued" })).into_response()
}

async fn poll_transcript(
    State(state): State<MockState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_auth(&state, &headers);
    let seen = state.polls.fetch_add(1, Ordering::SeqCst);

    if seen < state.config.pending_polls {
        return Json(json!({ "id": id, "status": "processing" })).into_response();
    }

    Json(state.config.final_transcript.clone()).into_response()
}
