//! Conversational replies via the Google Generative Language API

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// System instruction for conversational replies
pub const DEFAULT_PERSONA: &str = "You are Ada a smart home assistant.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Instruction<'a>,
    contents: Vec<Turn<'a>>,
}

#[derive(Serialize)]
struct Instruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Single-turn chat client used by the `talk` intent
pub struct TalkClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
    persona: String,
}

impl std::fmt::Debug for TalkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TalkClient")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl TalkClient {
    /// Create a chat client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client fails to build
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        model: String,
        persona: String,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("chat API key required for talk".to_string()));
        }

        let mut builder = Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            api_key,
            model,
            persona,
        })
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| Error::Config(format!("invalid chat API url: {e}")))
    }

    /// Ask the model to respond to `transcription`
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn reply(&self, transcription: &str) -> Result<String> {
        let url = self.endpoint()?;
        let body = build_request(&self.persona, transcription);

        tracing::debug!(model = %self.model, "requesting chat reply");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Talk(format!("chat API error {status}: {body}")));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        Ok(first_text(result))
    }
}

fn build_request<'a>(persona: &'a str, transcription: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        system_instruction: Instruction {
            parts: vec![TextPart { text: persona }],
        },
        contents: vec![Turn {
            role: "user",
            parts: vec![TextPart {
                text: transcription,
            }],
        }],
    }
}

fn first_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}
