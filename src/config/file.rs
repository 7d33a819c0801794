//! TOML configuration file loading
//!
//! Supports `~/.config/ada/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Intent model configuration
    #[serde(default)]
    pub ollama: OllamaFileConfig,

    /// Transcription configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Conversational reply configuration
    #[serde(default)]
    pub talk: TalkFileConfig,

    /// Streamed audio configuration
    #[serde(default)]
    pub audio: AudioFileConfig,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Local model service configuration
#[derive(Debug, Default, Deserialize)]
pub struct OllamaFileConfig {
    /// Base URL (e.g. "http://localhost:11434")
    pub url: Option<String>,

    /// Model used for intent classification
    pub intent_model: Option<String>,

    /// System prompt template; `{intents}` is replaced with the intent list
    pub intent_prompt: Option<String>,

    /// Sampling temperature for classification
    pub temperature: Option<f32>,

    /// Request timeout in seconds (0 disables)
    pub timeout_secs: Option<u64>,
}

/// Transcription configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// "cli" or "http"
    pub provider: Option<String>,

    /// Whisper executable for the CLI provider
    pub program: Option<String>,

    /// Whisper model name (e.g. "tiny")
    pub model: Option<String>,

    /// Spoken language code
    pub language: Option<String>,

    /// Base URL for the HTTP provider
    pub url: Option<String>,

    /// Timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Conversational reply configuration
#[derive(Debug, Default, Deserialize)]
pub struct TalkFileConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub url: Option<String>,
    pub persona: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Streamed audio configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Largest accumulated upload in bytes
    pub max_buffer_bytes: Option<usize>,
}

/// Parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn read_config_file(path: &Path) -> Result<AdaConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the TOML config file from the standard path
///
/// Returns `AdaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AdaConfigFile {
    let Some(path) = config_file_path() else {
        return AdaConfigFile::default();
    };

    if !path.exists() {
        return AdaConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            AdaConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/ada/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("ada").join("config.toml"))
}
