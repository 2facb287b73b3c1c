//! Response generation.

pub mod openai;

use crate::error::{Result, VoxloopError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Trait for generating a reply to one committed utterance.
///
/// One call per utterance, no streaming; conversation history is not kept.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a reply to the given utterance.
    async fn generate(&self, utterance: &str) -> Result<String>;
}

/// Mock responder for testing.
#[derive(Clone, Default)]
pub struct MockResponder {
    reply: Option<String>,
    should_fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockResponder {
    /// Create a mock that echoes the utterance back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a fixed reply instead of the echo.
    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Some(reply.to_string());
        self
    }

    /// Configure the mock to fail on generate.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// The utterances this responder has been asked about.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn generate(&self, utterance: &str) -> Result<String> {
        if self.should_fail {
            return Err(VoxloopError::Generation {
                message: "mock generation failure".to_string(),
            });
        }
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(utterance.to_string());
        }
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| format!("You said: {}", utterance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_echoes_by_default() {
        let responder = MockResponder::new();
        let reply = responder.generate("hello").await.unwrap();
        assert_eq!(reply, "You said: hello");
        assert_eq!(responder.prompts(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn mock_fixed_reply() {
        let responder = MockResponder::new().with_reply("Hi there");
        assert_eq!(responder.generate("anything").await.unwrap(), "Hi there");
    }

    #[tokio::test]
    async fn mock_failure() {
        let responder = MockResponder::new().with_failure();
        assert!(responder.generate("hello").await.is_err());
        assert!(responder.prompts().is_empty());
    }
}
