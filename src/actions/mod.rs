//! Side effects triggered by resolved intents
//!
//! Home-automation effects are logged only; `talk` calls out to a chat model.

mod talk;

pub use talk::{DEFAULT_PERSONA, TalkClient};

use async_trait::async_trait;

use crate::Result;

/// Handlers for every intent
///
/// Implementations report their own failures through the returned `Result`;
/// the dispatcher logs them and never lets them abort a request.
#[async_trait]
pub trait Actions: Send + Sync {
    /// Turn the lights on
    async fn lights_on(&self) -> Result<()>;

    /// Turn the lights off
    async fn lights_off(&self) -> Result<()>;

    /// Set an alarm
    async fn set_alarm(&self) -> Result<()>;

    /// Look up the weather
    async fn check_weather(&self) -> Result<()>;

    /// Hold a conversation about `transcription`
    async fn talk(&self, transcription: &str) -> Result<()>;

    /// Speech that was not addressed to the assistant
    async fn not_for_me(&self) -> Result<()> {
        tracing::info!("utterance not meant for Ada");
        Ok(())
    }

    /// Nothing matched
    async fn unknown(&self) -> Result<()> {
        tracing::info!("unknown intent");
        Ok(())
    }
}

/// Default actions for a home install
pub struct HomeActions {
    talk: Option<TalkClient>,
}

impl HomeActions {
    /// Create actions; without a talk client the `talk` intent reports an error
    #[must_use]
    pub const fn new(talk: Option<TalkClient>) -> Self {
        Self { talk }
    }
}

#[async_trait]
impl Actions for HomeActions {
    async fn lights_on(&self) -> Result<()> {
        tracing::info!("turning on the lights");
        Ok(())
    }

    async fn lights_off(&self) -> Result<()> {
        tracing::info!("turning off the lights");
        Ok(())
    }

    async fn set_alarm(&self) -> Result<()> {
        tracing::info!("setting the alarm");
        Ok(())
    }

    async fn check_weather(&self) -> Result<()> {
        tracing::info!("checking the weather");
        Ok(())
    }

    async fn talk(&self, transcription: &str) -> Result<()> {
        let client = self.talk.as_ref().ok_or_else(|| {
            crate::Error::Config("talk requested but no chat API key is configured".to_string())
        })?;

        let reply = client.reply(transcription).await?;
        tracing::info!(reply = %reply, "chat response");
        Ok(())
    }
}
