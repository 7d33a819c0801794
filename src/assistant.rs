//! End-to-end handling of one voice command
//!
//! Stages run strictly in order: transcribe, classify, dispatch.

use std::sync::Arc;

use axum::body::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::actions::{Actions, HomeActions, TalkClient};
use crate::config::{Config, SttProvider};
use crate::intent::{self, DispatchContext, Intent, IntentClassifier, OllamaClient, RequestBuilder};
use crate::Result;
use crate::voice::{Transcriber, WhisperCli, WhisperHttp};

/// What a handled command resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub transcription: String,
    pub intent: Intent,
}

/// The voice command pipeline
#[derive(Clone)]
pub struct Assistant {
    transcriber: Arc<dyn Transcriber>,
    classifier: IntentClassifier,
    actions: Arc<dyn Actions>,
}

impl Assistant {
    /// Assemble a pipeline from its parts
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        classifier: IntentClassifier,
        actions: Arc<dyn Actions>,
    ) -> Self {
        Self {
            transcriber,
            classifier,
            actions,
        }
    }

    /// Build the pipeline described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the prompt template or an endpoint is unusable
    pub fn from_config(config: &Config) -> Result<Self> {
        let builder = RequestBuilder::new(
            config.ollama.intent_model.clone(),
            &config.ollama.intent_prompt,
            config.ollama.temperature,
        )?;
        let client = OllamaClient::new(&config.ollama.url, config.ollama.timeout)?;
        tracing::info!(
            endpoint = %client.endpoint(),
            model = %config.ollama.intent_model,
            "intent model configured"
        );
        let classifier = IntentClassifier::new(builder, Arc::new(client));

        let transcriber: Arc<dyn Transcriber> = match &config.stt.provider {
            SttProvider::Cli => Arc::new(WhisperCli::new(
                &config.stt.program,
                config.stt.model.clone(),
                config.stt.language.clone(),
                Some(config.stt.timeout),
            )),
            SttProvider::Http(url) => Arc::new(WhisperHttp::new(
                url,
                config.stt.model.clone(),
                Some(config.stt.language.clone()),
                config.stt.timeout,
            )?),
        };

        let talk = match &config.talk.api_key {
            Some(key) => Some(TalkClient::new(
                config.talk.url.clone(),
                SecretString::from(key.expose_secret().to_owned()),
                config.talk.model.clone(),
                config.talk.persona.clone(),
                config.talk.timeout,
            )?),
            None => {
                tracing::warn!("no chat API key configured, talk replies are unavailable");
                None
            }
        };

        Ok(Self::new(
            transcriber,
            classifier,
            Arc::new(HomeActions::new(talk)),
        ))
    }

    /// Transcription backend name
    #[must_use]
    pub fn transcriber_name(&self) -> &'static str {
        self.transcriber.name()
    }

    /// Handle one recorded command
    ///
    /// # Errors
    ///
    /// Returns error if transcription or classification fails. Handler
    /// failures are logged and never returned.
    pub async fn handle(&self, audio: Bytes) -> Result<Outcome> {
        let transcription = self.transcriber.transcribe(&audio).await?;
        self.respond(audio, transcription).await
    }

    /// Classify and act on text that has already been transcribed
    ///
    /// # Errors
    ///
    /// Returns error if classification fails
    pub async fn handle_text(&self, transcription: &str) -> Result<Outcome> {
        self.respond(Bytes::new(), transcription.to_string()).await
    }

    async fn respond(&self, audio: Bytes, transcription: String) -> Result<Outcome> {
        let response = self.classifier.classify(&transcription).await?;
        let ctx = DispatchContext::new(audio, transcription, response);

        intent::dispatch(&ctx, self.actions.as_ref()).await;

        Ok(Outcome {
            transcription: ctx.transcription,
            intent: ctx.intent,
        })
    }
}
