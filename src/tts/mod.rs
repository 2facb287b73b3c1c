//! Speech synthesis.

pub mod deepgram;

use crate::error::{Result, VoxloopError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Trait for synthesizing one reply into raw audio.
///
/// One call per reply, returning a complete linear16 PCM buffer at the
/// pipeline's sample rate.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize the text into raw little-endian 16-bit PCM bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Mock synthesizer for testing.
#[derive(Clone, Default)]
pub struct MockSynthesizer {
    audio: Vec<u8>,
    should_fail: bool,
    texts: Arc<Mutex<Vec<String>>>,
}

impl MockSynthesizer {
    /// Create a mock that returns an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the PCM bytes every call returns.
    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    /// Configure the mock to fail on synthesize.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// The texts this synthesizer has been asked to speak.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if self.should_fail {
            return Err(VoxloopError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        if let Ok(mut texts) = self.texts.lock() {
            texts.push(text.to_string());
        }
        Ok(self.audio.clone())
    }
}
