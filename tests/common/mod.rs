#![allow(dead_code)]

// Shared test harness: an in-process mock of the command backend plus a
// console wired to a scripted capture source.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use rover_console::backend::{
    ChatRequest, ChatResponse, EndSessionRequest, StartSessionResponse, TranscribeRequest,
    TranscribeResponse,
};
use rover_console::{
    BackendClient, CaptureConfig, SchedulerConfig, ScriptedCapture, VoiceConsole,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SESSION_ID: &str = "session-1";

/// Shared-state mock of the four backend routes, with per-route counters and
/// failure switches.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub start_calls: Arc<AtomicUsize>,
    pub end_calls: Arc<AtomicUsize>,
    pub chat_calls: Arc<AtomicUsize>,
    pub interim_calls: Arc<AtomicUsize>,
    pub final_calls: Arc<AtomicUsize>,

    pub fail_start: Arc<AtomicBool>,
    pub fail_chat: Arc<AtomicBool>,
    pub fail_final: Arc<AtomicBool>,

    pub chat_reply: Arc<Mutex<String>>,
    pub rotate_to: Arc<Mutex<Option<String>>>,
    pub interim_texts: Arc<Mutex<VecDeque<String>>>,
    pub final_text: Arc<Mutex<String>>,

    pub last_chat_session: Arc<Mutex<Option<String>>>,
    pub last_end_session: Arc<Mutex<Option<String>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.chat_reply.lock().unwrap() = "ok".to_string();
        *mock.final_text.lock().unwrap() = "final".to_string();
        mock
    }

    pub fn with_chat_reply(self, reply: &str) -> Self {
        *self.chat_reply.lock().unwrap() = reply.to_string();
        self
    }

    pub fn with_final_text(self, text: &str) -> Self {
        *self.final_text.lock().unwrap() = text.to_string();
        self
    }

    pub fn with_interim_texts(self, texts: &[&str]) -> Self {
        *self.interim_texts.lock().unwrap() =
            texts.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Serve the mock on an ephemeral port and return its base URL.
pub async fn spawn_backend(mock: MockBackend) -> String {
    let app = Router::new()
        .route("/session/start", post(start_session))
        .route("/session/end", post(end_session))
        .route("/chat", post(chat))
        .route("/transcribe", post(transcribe))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock backend");
    });

    format!("http://{addr}")
}

async fn start_session(State(mock): State<MockBackend>) -> Response {
    mock.start_calls.fetch_add(1, Ordering::SeqCst);
    if mock.fail_start.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(StartSessionResponse {
        session_id: SESSION_ID.to_string(),
    })
    .into_response()
}

async fn end_session(
    State(mock): State<MockBackend>,
    Json(request): Json<EndSessionRequest>,
) -> StatusCode {
    mock.end_calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_end_session.lock().unwrap() = Some(request.session_id);
    StatusCode::OK
}

async fn chat(State(mock): State<MockBackend>, Json(request): Json<ChatRequest>) -> Response {
    mock.chat_calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_chat_session.lock().unwrap() = Some(request.session_id);
    if mock.fail_chat.load(Ordering::SeqCst) {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    Json(ChatResponse {
        response: mock.chat_reply.lock().unwrap().clone(),
        session_id: mock.rotate_to.lock().unwrap().clone(),
    })
    .into_response()
}

async fn transcribe(
    State(mock): State<MockBackend>,
    Json(request): Json<TranscribeRequest>,
) -> Response {
    if request.final_chunk {
        mock.final_calls.fetch_add(1, Ordering::SeqCst);
        if mock.fail_final.load(Ordering::SeqCst) {
            return StatusCode::BAD_GATEWAY.into_response();
        }
        Json(TranscribeResponse {
            transcription: mock.final_text.lock().unwrap().clone(),
        })
        .into_response()
    } else {
        mock.interim_calls.fetch_add(1, Ordering::SeqCst);
        let transcription = mock
            .interim_texts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "partial".to_string());
        Json(TranscribeResponse { transcription }).into_response()
    }
}

/// Ten 10ms chunks of non-silent audio.
pub fn tone_script() -> Vec<Vec<i16>> {
    (0..10).map(|i| vec![(i as i16 + 1) * 100; 160]).collect()
}

pub fn test_capture_config() -> CaptureConfig {
    CaptureConfig {
        sample_rate: 16_000,
        channels: 1,
        chunk_duration_ms: 10,
    }
}

/// Console wired to the mock backend and a scripted source; returns the
/// release counter of the source alongside.
pub async fn scripted_console_with(
    mock: MockBackend,
    script: Vec<Vec<i16>>,
    flush_ms: u64,
    archive_dir: Option<PathBuf>,
) -> (VoiceConsole, Arc<AtomicUsize>) {
    let base_url = spawn_backend(mock).await;
    let client = Arc::new(
        BackendClient::new(&base_url, Duration::from_secs(5)).expect("backend client"),
    );

    let source = ScriptedCapture::new(test_capture_config(), script)
        .with_cadence(Duration::from_millis(5));
    let releases = source.release_count();

    let console = VoiceConsole::new(
        client,
        Box::new(source),
        SchedulerConfig {
            flush_interval: Duration::from_millis(flush_ms),
            archive_dir,
        },
    );

    (console, releases)
}

pub async fn scripted_console(
    mock: MockBackend,
    script: Vec<Vec<i16>>,
    flush_ms: u64,
) -> (VoiceConsole, Arc<AtomicUsize>) {
    scripted_console_with(mock, script, flush_ms, None).await
}

/// Poll a condition until it holds or the timeout passes.
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
