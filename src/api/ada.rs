//! Voice command endpoints
//!
//! A recorder either posts a whole recording to `/ada` or streams it through
//! `/ada/chunk` and finishes with `/ada/commit`. The caller always gets an
//! acknowledgement; pipeline failures only reach the logs.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::ApiState;
use crate::assistant::Outcome;
use crate::{Error, Intent};

/// Build the voice command router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ada", post(command))
        .route("/ada/chunk", post(chunk))
        .route("/ada/commit", post(commit))
        .with_state(state)
}

/// Acknowledgement returned for every accepted recording
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

impl Acknowledgement {
    const fn ok() -> Self {
        Self {
            status: "ok",
            intent: None,
        }
    }
}

/// Chunk upload response
#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    /// Bytes buffered so far
    pub buffered: usize,
}

/// Run the pipeline on a complete recording
///
/// An empty body is acknowledged without running the pipeline.
async fn command(State(state): State<Arc<ApiState>>, body: Bytes) -> Json<Acknowledgement> {
    if body.is_empty() {
        tracing::warn!("empty recording, nothing to classify");
        return Json(Acknowledgement::ok());
    }

    Json(run(&state, body).await)
}

/// Append a chunk of a streamed recording
async fn chunk(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<ChunkResponse>, AdaError> {
    if body.is_empty() {
        return Err(AdaError::BadRequest("Empty audio chunk"));
    }

    let buffered = state.buffer.append(body).await.map_err(AdaError::from)?;
    tracing::debug!(buffered, "audio chunk buffered");

    Ok(Json(ChunkResponse { buffered }))
}

/// Run the pipeline on everything streamed so far
async fn commit(State(state): State<Arc<ApiState>>) -> Result<Json<Acknowledgement>, AdaError> {
    let audio = state.buffer.take().await.map_err(AdaError::from)?;
    if audio.is_empty() {
        tracing::warn!("commit with no buffered audio, nothing to classify");
        return Ok(Json(Acknowledgement::ok()));
    }

    Ok(Json(run(&state, audio).await))
}

async fn run(state: &ApiState, audio: Bytes) -> Acknowledgement {
    let span = tracing::info_span!(
        "command",
        request_id = %Uuid::new_v4(),
        audio_bytes = audio.len()
    );

    let result = state.assistant.handle(audio).instrument(span.clone()).await;
    let _guard = span.enter();
    acknowledge(result)
}

fn acknowledge(result: crate::Result<Outcome>) -> Acknowledgement {
    match result {
        Ok(outcome) => {
            tracing::info!(
                intent = %outcome.intent,
                transcription = %outcome.transcription,
                "command handled"
            );
            Acknowledgement {
                status: "ok",
                intent: Some(outcome.intent),
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            Acknowledgement::ok()
        }
    }
}

/// Voice command API errors
#[derive(Debug)]
pub enum AdaError {
    BadRequest(&'static str),
    BufferFull(String),
    Unavailable(String),
}

impl From<Error> for AdaError {
    fn from(e: Error) -> Self {
        match &e {
            Error::BufferFull { .. } => Self::BufferFull(e.to_string()),
            _ => Self::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for AdaError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::BufferFull(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "buffer_full", msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassifyError;

    #[test]
    fn test_acknowledge_success_carries_intent() {
        let ack = acknowledge(Ok(Outcome {
            transcription: "lights on".to_string(),
            intent: Intent::LightsOn,
        }));

        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok", "intent": "turn_on_light"}));
    }

    #[test]
    fn test_acknowledge_failure_is_still_ok() {
        let err = Error::Classify(ClassifyError::RequestBuild("boom".to_string()));
        let json = serde_json::to_value(acknowledge(Err(err))).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[test]
    fn test_buffer_errors_map_to_status() {
        let full = AdaError::from(Error::BufferFull { limit: 4 });
        assert_eq!(full.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);

        let stopped = AdaError::from(Error::Audio("audio buffer task stopped".to_string()));
        assert_eq!(stopped.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
