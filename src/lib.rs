//! Ada Gateway - Voice command front end for the Ada home assistant
//!
//! A recording goes through three stages:
//! - Transcription with Whisper
//! - Intent classification by a local Ollama model constrained to a JSON schema
//! - Dispatch of the resolved intent to its action
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 HTTP API (/ada)                      │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │                   Assistant                          │
//! │   Transcriber  │  IntentClassifier  │  Dispatcher    │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │                    Actions                           │
//! │   Lights  │  Alarm  │  Weather  │  Talk (Google AI)  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod intent;
pub mod voice;

pub use actions::{Actions, HomeActions, TalkClient};
pub use assistant::{Assistant, Outcome};
pub use config::Config;
pub use error::{ClassifyError, Error, Result};
pub use intent::{ClassificationResponse, Content, Intent, IntentClassifier};
pub use voice::{AudioBuffer, Transcriber};
