//! Configuration management for the Ada gateway
//!
//! Values resolve as environment > config file > default.

pub mod file;

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::actions::DEFAULT_PERSONA;
use crate::intent::DEFAULT_INTENT_PROMPT;
use crate::{Error, Result};
use file::AdaConfigFile;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_INTENT_MODEL: &str = "llama3.2";
const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WHISPER_PROGRAM: &str = "whisper";
const DEFAULT_WHISPER_MODEL: &str = "tiny";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_STT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CHAT_URL: &str = "https://generativelanguage.googleapis.com/";
const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BUFFER_BYTES: usize = 16 * 1024 * 1024;

/// Ada gateway configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Intent classification model configuration
    pub ollama: OllamaConfig,

    /// Transcription configuration
    pub stt: SttConfig,

    /// Conversational reply configuration
    pub talk: TalkConfig,

    /// Streamed audio configuration
    pub audio: AudioConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Local model service configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    pub url: Url,

    /// Model used for intent classification
    pub intent_model: String,

    /// System prompt template with an `{intents}` placeholder
    pub intent_prompt: String,

    /// Sampling temperature; `None` leaves the model default
    pub temperature: Option<f32>,

    /// Per-call timeout; zero disables it
    pub timeout: Duration,
}

/// Transcription backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SttProvider {
    /// Run the `whisper` CLI
    Cli,
    /// POST to an OpenAI-compatible transcription endpoint
    Http(Url),
}

/// Transcription configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub provider: SttProvider,

    /// Whisper executable for the CLI provider
    pub program: String,

    /// Whisper model name
    pub model: String,

    /// Spoken language code
    pub language: String,

    pub timeout: Duration,
}

/// Conversational reply configuration
#[derive(Debug)]
pub struct TalkConfig {
    /// Google AI API key; `talk` is unavailable without it
    pub api_key: Option<SecretString>,

    pub model: String,

    pub url: Url,

    /// System instruction for replies
    pub persona: String,

    pub timeout: Duration,
}

/// Streamed audio configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Largest accumulated upload in bytes
    pub max_buffer_bytes: usize,
}

impl Config {
    /// Load configuration from the environment and a config file
    ///
    /// An explicit `path` must exist and parse; otherwise the standard location
    /// is used when present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit file is unreadable or a value is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(),
        };

        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Assemble configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a URL, number or provider name is invalid
    pub fn from_sources(fc: AdaConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server = ServerConfig {
            host: env("ADA_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_env(&env, "ADA_PORT")?
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let ollama = OllamaConfig {
            url: parse_url(
                "ollama url",
                &env("OLLAMA_URL")
                    .or(fc.ollama.url)
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            )?,
            intent_model: env("ADA_INTENT_MODEL")
                .or(fc.ollama.intent_model)
                .unwrap_or_else(|| DEFAULT_INTENT_MODEL.to_string()),
            intent_prompt: env("ADA_INTENT_PROMPT")
                .or(fc.ollama.intent_prompt)
                .unwrap_or_else(|| DEFAULT_INTENT_PROMPT.to_string()),
            temperature: parse_env(&env, "ADA_INTENT_TEMPERATURE")?
                .or(fc.ollama.temperature)
                .or(Some(0.0)),
            timeout: Duration::from_secs(
                parse_env(&env, "ADA_OLLAMA_TIMEOUT_SECS")?
                    .or(fc.ollama.timeout_secs)
                    .unwrap_or(DEFAULT_OLLAMA_TIMEOUT_SECS),
            ),
        };

        let stt_url = env("ADA_STT_URL").or(fc.stt.url);
        let provider = match env("ADA_STT_PROVIDER")
            .or(fc.stt.provider)
            .as_deref()
            .unwrap_or("cli")
        {
            "cli" => SttProvider::Cli,
            "http" => {
                let url = stt_url.ok_or_else(|| {
                    Error::Config("stt provider \"http\" requires stt.url".to_string())
                })?;
                SttProvider::Http(parse_url("stt url", &url)?)
            }
            other => {
                return Err(Error::Config(format!(
                    "unknown stt provider \"{other}\" (expected \"cli\" or \"http\")"
                )));
            }
        };

        let stt = SttConfig {
            provider,
            program: env("ADA_WHISPER_BIN")
                .or(fc.stt.program)
                .unwrap_or_else(|| DEFAULT_WHISPER_PROGRAM.to_string()),
            model: env("ADA_WHISPER_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| DEFAULT_WHISPER_MODEL.to_string()),
            language: env("ADA_WHISPER_LANGUAGE")
                .or(fc.stt.language)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            timeout: Duration::from_secs(
                parse_env(&env, "ADA_STT_TIMEOUT_SECS")?
                    .or(fc.stt.timeout_secs)
                    .unwrap_or(DEFAULT_STT_TIMEOUT_SECS),
            ),
        };

        let talk = TalkConfig {
            api_key: env("GOOGLE_AI_API_KEY")
                .or(fc.talk.api_key)
                .filter(|key| !key.is_empty())
                .map(SecretString::from),
            model: env("ADA_CHAT_MODEL")
                .or(fc.talk.model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            url: parse_url(
                "chat url",
                &env("ADA_CHAT_URL")
                    .or(fc.talk.url)
                    .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            )?,
            persona: env("ADA_PERSONA_PROMPT")
                .or(fc.talk.persona)
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            timeout: Duration::from_secs(
                parse_env(&env, "ADA_CHAT_TIMEOUT_SECS")?
                    .or(fc.talk.timeout_secs)
                    .unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS),
            ),
        };

        let audio = AudioConfig {
            max_buffer_bytes: parse_env(&env, "ADA_MAX_BUFFER_BYTES")?
                .or(fc.audio.max_buffer_bytes)
                .unwrap_or(DEFAULT_MAX_BUFFER_BYTES),
        };

        Ok(Self {
            server,
            ollama,
            stt,
            talk,
            audio,
        })
    }
}

fn parse_url(what: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::Config(format!("invalid {what} \"{value}\": {e}")))
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {key} \"{value}\": {e}")))
        })
        .transpose()
}
