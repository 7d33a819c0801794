//! HTTP client for the local model service

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{Client, StatusCode, header};
use url::Url;

use super::request::ClassificationRequest;
use crate::error::ClassifyError;

/// Chat endpoint path on an Ollama-compatible server
pub const CHAT_PATH: &str = "/api/chat";

/// Unparsed answer from the model service
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Sends classification requests to a model service
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Deliver `request` and return the raw success response
    ///
    /// # Errors
    ///
    /// Returns `Serialization`, `Transport` or `RemoteRejection`; never retries
    async fn send(&self, request: &ClassificationRequest) -> Result<RawResponse, ClassifyError>;
}

/// Client for an Ollama `/api/chat` endpoint
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: Url,
}

impl OllamaClient {
    /// Create a client for the server at `base_url`
    ///
    /// A zero `timeout` leaves calls unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::RequestBuild`] if the endpoint cannot be derived
    /// from `base_url` or the HTTP client fails to initialize
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ClassifyError> {
        let endpoint = base_url
            .join(CHAT_PATH)
            .map_err(|e| ClassifyError::RequestBuild(format!("invalid model service url: {e}")))?;

        let mut builder = Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClassifyError::RequestBuild(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// Full URL requests are posted to
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn send(&self, request: &ClassificationRequest) -> Result<RawResponse, ClassifyError> {
        let payload = serde_json::to_vec(request).map_err(ClassifyError::Serialization)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            payload_bytes = payload.len(),
            "sending classification request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, endpoint = %self.endpoint, "model service request failed");
                ClassifyError::Transport(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read model service response");
            ClassifyError::Transport(e)
        })?;

        tracing::debug!(status = %status, body_bytes = body.len(), "received model service response");

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::error!(status = %status, body = %body, "model service error");
            return Err(ClassifyError::RemoteRejection { status, body });
        }

        Ok(RawResponse { status, body })
    }
}
