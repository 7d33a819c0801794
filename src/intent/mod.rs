//! Intent classification pipeline
//!
//! ```text
//! transcription ─▶ RequestBuilder ─▶ ModelClient ─▶ ClassificationResponse ─▶ dispatch
//! ```

mod client;
mod dispatch;
mod request;
mod response;
mod schema;

pub use client::{CHAT_PATH, ModelClient, OllamaClient, RawResponse};
pub use dispatch::{DispatchContext, Handler, HandlerFuture, HandlerRegistry, dispatch};
pub use request::{
    ChatMessage, ClassificationRequest, DEFAULT_INTENT_PROMPT, INTENTS_PLACEHOLDER, ModelOptions,
    RequestBuilder, Role,
};
pub use response::{ClassificationResponse, Content, ResponseMessage, ResponseMetrics};
pub use schema::{
    EVALUATION_FIELD, Intent, OutputSchema, PropertySchema, SchemaType, enumerated_intents,
    output_schema,
};

use std::sync::Arc;

use crate::error::ClassifyError;

/// Classifies transcriptions with a schema-constrained model call
#[derive(Clone)]
pub struct IntentClassifier {
    builder: RequestBuilder,
    client: Arc<dyn ModelClient>,
}

impl IntentClassifier {
    /// Create a classifier
    #[must_use]
    pub fn new(builder: RequestBuilder, client: Arc<dyn ModelClient>) -> Self {
        Self { builder, client }
    }

    /// Request builder in use
    #[must_use]
    pub const fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    /// Classify `transcription`
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifyError`] if the model call fails or its answer cannot
    /// be decoded. An intent outside the known set is not an error.
    pub async fn classify(&self, transcription: &str) -> Result<ClassificationResponse, ClassifyError> {
        let request = self.builder.build(transcription);
        let raw = self.client.send(&request).await?;
        let response = ClassificationResponse::decode(&raw.body)?;

        tracing::info!(
            intent = %response.intent(),
            raw = response.raw(),
            eval_count = response.metrics.eval_count,
            "classified transcription"
        );

        Ok(response)
    }
}
