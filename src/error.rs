//! Error types for the Ada gateway

use thiserror::Error;

/// Result type alias for Ada operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Ada gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Audio ingestion error
    #[error("audio error: {0}")]
    Audio(String),

    /// Streamed audio would exceed the buffer limit
    #[error("audio buffer limit of {limit} bytes exceeded")]
    BufferFull { limit: usize },

    /// Conversational reply error
    #[error("talk error: {0}")]
    Talk(String),

    /// Intent classification error
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures of a single intent classification call
///
/// Every variant is recoverable: the caller decides how to answer the
/// triggering request. An intent outside the known set is not an error.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Prompt template or model configuration is unusable
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// Request could not be encoded for the wire
    #[error("request serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Model service could not be reached or the exchange broke off
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Model service answered with a non-success status
    #[error("model service rejected request ({status}): {body}")]
    RemoteRejection {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Response matched neither content shape
    #[error("content decode error: {reason} (payload: {payload})")]
    ContentDecode { reason: String, payload: String },
}

impl ClassifyError {
    /// Build a decode error carrying the offending bytes
    pub(crate) fn content_decode(reason: impl Into<String>, payload: &[u8]) -> Self {
        Self::ContentDecode {
            reason: reason.into(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}
