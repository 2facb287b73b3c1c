//! Deepgram speech synthesis.

use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::tts::Synthesizer;
use async_trait::async_trait;
use serde::Serialize;

/// Synthesizer backed by the Deepgram speak endpoint.
///
/// Requests raw linear16 PCM at the pipeline rate so the reply can be fed
/// straight to the playback device without transcoding.
pub struct DeepgramSynthesizer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    voice: String,
    sample_rate: u32,
    channels: u16,
}

impl DeepgramSynthesizer {
    /// Create a synthesizer with the default endpoint and voice.
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            endpoint: defaults::SPEAKER_ENDPOINT.to_string(),
            voice: defaults::SPEAKER_VOICE.to_string(),
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
        }
    }

    /// Override the endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Override the synthesis voice.
    pub fn with_voice(mut self, voice: &str) -> Self {
        self.voice = voice.to_string();
        self
    }

    fn accept_header(&self) -> String {
        format!(
            "audio/x-raw;encoding=linear16;rate={};channels={}",
            self.sample_rate, self.channels
        )
    }
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

#[async_trait]
impl Synthesizer for DeepgramSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = SpeakRequest {
            text,
            voice: Some(&self.voice),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Accept", self.accept_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| VoxloopError::Synthesis {
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxloopError::Synthesis {
                message: format!("status {}: {}", status, body),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoxloopError::Synthesis {
                message: format!("read failed: {}", e),
            })?;
        Ok(audio.to_vec())
    }
}
