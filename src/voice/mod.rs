//! Voice input collaborators
//!
//! Transcription backends and the streamed-audio accumulator.

mod buffer;
mod stt;

pub use buffer::AudioBuffer;
pub use stt::{Transcriber, WhisperCli, WhisperHttp};
