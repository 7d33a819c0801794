//! Shared test utilities
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ada_gateway::intent::{DEFAULT_INTENT_PROMPT, OllamaClient, RequestBuilder};
use ada_gateway::{Actions, Assistant, Intent, IntentClassifier, Result, Transcriber};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use url::Url;

/// In-process stand-in for the model and transcription services
pub struct FakeServer {
    pub url: Url,
    state: Arc<FakeState>,
}

struct FakeState {
    status: StatusCode,
    chat_body: String,
    transcript: String,
    requests: Mutex<Vec<serde_json::Value>>,
}

impl FakeServer {
    /// Serve `chat_body` from `/api/chat` with `status`
    pub async fn start(status: StatusCode, chat_body: impl Into<String>) -> Self {
        Self::start_with_transcript(status, chat_body, "").await
    }

    /// Also answer `/v1/audio/transcriptions` with `transcript`
    pub async fn start_with_transcript(
        status: StatusCode,
        chat_body: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        let state = Arc::new(FakeState {
            status,
            chat_body: chat_body.into(),
            transcript: transcript.into(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/chat", post(chat))
            .route("/v1/audio/transcriptions", post(transcriptions))
            .route("/v1beta/models/gemini-test:generateContent", post(generate))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake server");
        let addr = listener.local_addr().expect("fake server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake server");
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).expect("fake server url"),
            state,
        }
    }

    /// Chat requests received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn chat(State(state): State<Arc<FakeState>>, body: Bytes) -> (StatusCode, String) {
    let request = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.requests.lock().unwrap().push(request);
    (state.status, state.chat_body.clone())
}

async fn transcriptions(State(state): State<Arc<FakeState>>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "text": state.transcript }))
}

async fn generate(
    State(state): State<Arc<FakeState>>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let request: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    state.requests.lock().unwrap().push(request.clone());

    if headers.get("x-goog-api-key").is_none() {
        return (StatusCode::UNAUTHORIZED, axum::Json(serde_json::json!({ "error": "no key" })));
    }

    let heard = request["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": format!("you said: {heard}") }] } }]
        })),
    )
}

/// Ollama envelope with `content` as the message content
pub fn chat_body(content: &serde_json::Value) -> String {
    serde_json::json!({
        "model": "llama3.2",
        "created_at": "2024-07-22T20:33:28.123648Z",
        "message": { "role": "assistant", "content": content },
        "done": true,
        "done_reason": "stop",
        "total_duration": 1_234_567,
        "eval_count": 7
    })
    .to_string()
}

/// Transcriber that always hears the same words
pub struct StaticTranscriber(pub &'static str);

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Counts handler invocations per intent
#[derive(Default)]
pub struct CountingActions {
    counts: [AtomicUsize; 7],
    pub talked: Mutex<Vec<String>>,
}

impl CountingActions {
    pub fn count(&self, intent: Intent) -> usize {
        self.counts[slot(intent)].load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    fn hit(&self, intent: Intent) -> Result<()> {
        self.counts[slot(intent)].fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn slot(intent: Intent) -> usize {
    Intent::ALL
        .iter()
        .position(|i| *i == intent)
        .expect("intent in ALL")
}

#[async_trait]
impl Actions for CountingActions {
    async fn lights_on(&self) -> Result<()> {
        self.hit(Intent::LightsOn)
    }

    async fn lights_off(&self) -> Result<()> {
        self.hit(Intent::LightsOff)
    }

    async fn set_alarm(&self) -> Result<()> {
        self.hit(Intent::SetAlarm)
    }

    async fn check_weather(&self) -> Result<()> {
        self.hit(Intent::CheckWeather)
    }

    async fn talk(&self, transcription: &str) -> Result<()> {
        self.talked.lock().unwrap().push(transcription.to_string());
        self.hit(Intent::Talk)
    }

    async fn not_for_me(&self) -> Result<()> {
        self.hit(Intent::NotForMe)
    }

    async fn unknown(&self) -> Result<()> {
        self.hit(Intent::Unknown)
    }
}

/// Classifier talking to the Ollama server at `url`
pub fn classifier(url: &Url) -> IntentClassifier {
    let builder = RequestBuilder::new("llama3.2".to_string(), DEFAULT_INTENT_PROMPT, Some(0.0))
        .expect("default prompt is valid");
    let client = OllamaClient::new(url, Duration::from_secs(5)).expect("client");
    IntentClassifier::new(builder, Arc::new(client))
}

/// Pipeline with a fixed transcript and counting actions
pub fn assistant(url: &Url, heard: &'static str) -> (Assistant, Arc<CountingActions>) {
    let actions = Arc::new(CountingActions::default());
    let assistant = Assistant::new(
        Arc::new(StaticTranscriber(heard)),
        classifier(url),
        actions.clone(),
    );
    (assistant, actions)
}

/// URL of a port nothing listens on
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    Url::parse(&format!("http://{addr}")).expect("url")
}
