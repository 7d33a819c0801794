//! Decoding of model service responses
//!
//! The `message.content` field arrives in one of two shapes: an object
//! `{"evaluation": "<intent>"}` or a bare string. The object shape is tried
//! first. A bare string that itself holds the JSON object (how Ollama returns
//! schema-constrained output) resolves to the object shape as well. An object
//! or `null` with no evaluation counts as `Unknown`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::schema::{EVALUATION_FIELD, Intent};
use crate::error::ClassifyError;

/// Classification result carried in `message.content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// `{"evaluation": "<intent>"}`; unfamiliar labels are already `Unknown`
    Structured { evaluation: Intent },
    /// Free text the model produced instead of the object
    Raw { text: String },
}

impl Content {
    /// Resolved intent; raw text always counts as `Unknown`
    #[must_use]
    pub const fn intent(&self) -> Intent {
        match self {
            Self::Structured { evaluation } => *evaluation,
            Self::Raw { .. } => Intent::Unknown,
        }
    }

    /// Raw text, when the model did not answer with the object shape
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Structured { .. } => None,
            Self::Raw { text } => Some(text),
        }
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(mut fields) => match fields.remove(EVALUATION_FIELD) {
                None | Some(Value::Null) => Ok(Self::unpopulated()),
                Some(Value::String(evaluation)) => Ok(StructuredContent { evaluation }.into()),
                Some(other) => {
                    fields.insert(EVALUATION_FIELD.to_string(), other);
                    Err(Value::Object(fields))
                }
            },
            Value::Null => Ok(Self::unpopulated()),
            Value::String(text) => {
                let embedded = serde_json::from_str::<StructuredContent>(text.trim());
                Ok(embedded.map_or(Self::Raw { text }, Self::from))
            }
            other => Err(other),
        }
    }

    fn unpopulated() -> Self {
        tracing::warn!("model response carried no evaluation, treating as unknown");
        Self::Structured {
            evaluation: Intent::Unknown,
        }
    }
}

#[derive(Deserialize)]
struct StructuredContent {
    evaluation: String,
}

impl From<StructuredContent> for Content {
    fn from(content: StructuredContent) -> Self {
        if !Intent::is_known_label(&content.evaluation) {
            tracing::warn!(label = %content.evaluation, "model returned an intent outside the known set");
        }
        Self::Structured {
            evaluation: Intent::from_label(&content.evaluation),
        }
    }
}

/// Assistant message of a chat response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub role: Option<String>,
    pub content: Content,
}

/// Timing and token counters, informational only
///
/// Values of an unexpected type are dropped rather than failing the decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseMetrics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub load_duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_eval_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub eval_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub eval_duration: Option<u64>,
}

/// Whole or fractional non-negative number; anything else becomes `None`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        v.as_u64().or_else(|| {
            v.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        })
    }))
}

/// RFC 3339 timestamp; empty or malformed values become `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|t| t.with_timezone(&Utc)))
}

/// Decoded answer of a classification call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResponse {
    pub model: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub done: Option<bool>,
    pub done_reason: Option<String>,
    pub metrics: ResponseMetrics,
    pub message: ResponseMessage,
}

#[derive(Deserialize)]
struct WireResponse {
    model: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    done: Option<bool>,
    done_reason: Option<String>,
    #[serde(flatten)]
    metrics: ResponseMetrics,
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    role: Option<String>,
    content: Value,
}

impl ClassificationResponse {
    /// Decode a raw response body
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::ContentDecode`] with the offending bytes if the
    /// envelope is malformed or the content matches neither shape
    pub fn decode(bytes: &[u8]) -> Result<Self, ClassifyError> {
        let wire: WireResponse = serde_json::from_slice(bytes).map_err(|e| {
            tracing::error!(error = %e, "failed to parse model service response");
            ClassifyError::content_decode(format!("malformed response envelope: {e}"), bytes)
        })?;

        let content = Content::from_value(wire.message.content).map_err(|value| {
            let payload = serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
            tracing::error!(content = %value, "content matched neither an evaluation object nor a string");
            ClassifyError::content_decode("content is neither an evaluation object nor a string", &payload)
        })?;

        Ok(Self {
            model: wire.model,
            created_at: wire.created_at,
            done: wire.done,
            done_reason: wire.done_reason,
            metrics: wire.metrics,
            message: ResponseMessage {
                role: wire.message.role,
                content,
            },
        })
    }

    /// Intent the model settled on, `Unknown` for raw text
    #[must_use]
    pub const fn intent(&self) -> Intent {
        self.message.content.intent()
    }

    /// Raw text, when the model ignored the object shape
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.message.content.raw()
    }
}
