//! OpenAI chat-completion responder.

use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::llm::Responder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Responder backed by the OpenAI chat-completions endpoint.
pub struct OpenAiResponder {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiResponder {
    /// Create a responder with the default endpoint and model.
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            endpoint: defaults::RESPONDER_ENDPOINT.to_string(),
            model: defaults::RESPONDER_MODEL.to_string(),
        }
    }

    /// Override the endpoint (for tests or compatible gateways).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Override the chat model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Responder for OpenAiResponder {
    async fn generate(&self, utterance: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: utterance,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoxloopError::Generation {
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxloopError::Generation {
                message: format!("status {}: {}", status, body),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| VoxloopError::Generation {
                    message: format!("unparseable response: {}", e),
                })?;

        // No choices is a valid (empty) reply; the response stage drops it.
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello there",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello there");
    }

    #[test]
    fn response_first_choice_wins() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Hi!"}},{"message":{"role":"assistant","content":"ignored"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        assert_eq!(reply, "Hi!");
    }

    #[test]
    fn empty_choices_is_empty_reply() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        assert_eq!(reply, "");
    }
}
