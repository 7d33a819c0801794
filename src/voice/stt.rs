//! Speech-to-text (STT) processing

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use url::Url;

use crate::{Error, Result};

/// Default limit for a single CLI transcription
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// File name the incoming audio is written to
const AUDIO_FILE_NAME: &str = "audio.wav";

/// Turns recorded audio into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Transcribes by running the `whisper` command-line tool
#[derive(Debug, Clone)]
pub struct WhisperCli {
    program: PathBuf,
    model: String,
    language: String,
    timeout: Duration,
}

impl WhisperCli {
    /// Create a CLI transcriber
    ///
    /// The program is resolved on `PATH` up front; a missing binary is logged
    /// and surfaces as an error on each transcription instead.
    #[must_use]
    pub fn new(program: &str, model: String, language: String, timeout: Option<Duration>) -> Self {
        let program = match which::which(program) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "resolved whisper binary");
                path
            }
            Err(e) => {
                tracing::warn!(program, error = %e, "whisper binary not found, transcription will fail");
                PathBuf::from(program)
            }
        };

        Self {
            program,
            model,
            language,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    /// Command-line arguments for transcribing `input` into `output_dir`
    fn args(&self, input: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            input.display().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--language".to_string(),
            self.language.clone(),
            "--output_format".to_string(),
            "txt".to_string(),
            "--output_dir".to_string(),
            output_dir.display().to_string(),
        ]
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting whisper transcription");

        // Each request gets its own directory so concurrent calls never share files
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(AUDIO_FILE_NAME);
        tokio::fs::write(&input, audio).await?;

        let child = Command::new(&self.program)
            .args(self.args(&input, workdir.path()))
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Stt(format!("failed to spawn {}: {e}", self.program.display())))?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Stt(format!("whisper timed out after {:?}", self.timeout)))?
            .map_err(|e| Error::Stt(format!("whisper execution failed: {e}")))?;

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(stderr = %stderr, "whisper stderr");
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(Error::Stt(format!("whisper exited with code {code}")));
        }

        let transcript_path = input.with_extension("txt");
        let transcript = match tokio::fs::read_to_string(&transcript_path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "no transcript file, using stdout");
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
        };

        let transcript = transcript.trim().to_string();
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "whisper-cli"
    }
}

/// Response from an OpenAI-compatible transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcribes through an OpenAI-compatible `/v1/audio/transcriptions` endpoint
#[derive(Debug, Clone)]
pub struct WhisperHttp {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    language: Option<String>,
}

impl WhisperHttp {
    /// Create an HTTP transcriber for the server at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL cannot be built
    pub fn new(base_url: &Url, model: String, language: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = base_url
            .join("/v1/audio/transcriptions")
            .map_err(|e| Error::Config(format!("invalid STT url: {e}")))?;

        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            model,
            language,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperHttp {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), endpoint = %self.endpoint, "starting HTTP transcription");

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name(AUDIO_FILE_NAME)
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        let transcript = result.text.trim().to_string();
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "whisper-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args() {
        let cli = WhisperCli::new(
            "whisper",
            "tiny".to_string(),
            "en".to_string(),
            None,
        );
        let args = cli.args(Path::new("/tmp/x/audio.wav"), Path::new("/tmp/x"));

        assert_eq!(
            args,
            vec![
                "/tmp/x/audio.wav",
                "--model",
                "tiny",
                "--language",
                "en",
                "--output_format",
                "txt",
                "--output_dir",
                "/tmp/x",
            ]
        );
    }

    #[tokio::test]
    async fn test_cli_missing_binary_is_error() {
        let cli = WhisperCli::new(
            "definitely-not-a-whisper-binary",
            "tiny".to_string(),
            "en".to_string(),
            Some(Duration::from_secs(5)),
        );

        let err = cli.transcribe(b"RIFF").await.unwrap_err();
        assert!(matches!(err, Error::Stt(_)));
    }

    #[test]
    fn test_http_endpoint() {
        let base = Url::parse("http://localhost:9000").unwrap();
        let stt = WhisperHttp::new(&base, "whisper-1".to_string(), None, Duration::ZERO).unwrap();
        assert_eq!(stt.endpoint.as_str(), "http://localhost:9000/v1/audio/transcriptions");
    }
}
