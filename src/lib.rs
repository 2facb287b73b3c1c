//! voxloop - hands-free voice conversation loop
//!
//! Microphone audio streams to a live transcription service, a turn-taking
//! coordinator debounces final transcripts into utterances, a chat model
//! answers, and the answer is synthesized and spoken back — while the
//! assistant's own voice is suppressed from recognition.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;
pub mod turn;

// Core traits (device and collaborator seams)
pub use audio::playback::{CpalSpeechPlayer, MockSpeechPlayer, SpeechPlayer};
pub use audio::source::{MicSource, MockMicSource};
pub use llm::{MockResponder, Responder};
pub use stt::{MockRecognizer, Recognizer, RecognizerSession};
pub use tts::{MockSynthesizer, Synthesizer};

// Pipeline
pub use pipeline::{AudioFrame, Pipeline, PipelineConfig, PipelineHandle, Transcript};
pub use turn::{TurnCoordinator, TurnState};

// Error handling
pub use error::{Result, VoxloopError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.0.1+abc1234"` when git hash is available, `"0.0.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
