//! Deepgram live transcription over one persistent WebSocket connection.

use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::pipeline::types::Transcript;
use crate::stt::{AudioSink, Recognizer, RecognizerSession, TranscriptSource};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Streaming recognizer backed by the Deepgram listen endpoint.
pub struct DeepgramRecognizer {
    api_key: String,
    endpoint: String,
    model: String,
    sample_rate: u32,
    channels: u16,
}

impl DeepgramRecognizer {
    /// Create a recognizer with the default endpoint and model.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            endpoint: defaults::RECOGNIZER_ENDPOINT.to_string(),
            model: defaults::RECOGNIZER_MODEL.to_string(),
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
        }
    }

    /// Override the endpoint (for tests or self-hosted deployments).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Override the transcription model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn listen_url(&self) -> String {
        format!(
            "{}?model={}&encoding=linear16&sample_rate={}&channels={}",
            self.endpoint, self.model, self.sample_rate, self.channels
        )
    }
}

#[async_trait]
impl Recognizer for DeepgramRecognizer {
    async fn connect(&self) -> Result<RecognizerSession> {
        let url = self.listen_url();
        let mut request =
            url.clone()
                .into_client_request()
                .map_err(|e| VoxloopError::Recognition {
                    message: format!("invalid listen URL {}: {}", url, e),
                })?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.api_key)).map_err(|e| {
            VoxloopError::Recognition {
                message: format!("invalid credential header: {}", e),
            }
        })?;
        request.headers_mut().insert("Authorization", auth);

        log::info!("connecting to transcription stream: {}", url);
        let (ws, _response) =
            connect_async(request)
                .await
                .map_err(|e| VoxloopError::Recognition {
                    message: format!("connect failed: {}", e),
                })?;

        let (sink, stream) = ws.split();
        Ok(RecognizerSession {
            audio: Box::new(DeepgramAudioSink { sink }),
            events: Box::new(DeepgramTranscriptSource { stream }),
        })
    }
}

struct DeepgramAudioSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl AudioSink for DeepgramAudioSink {
    async fn send_audio(&mut self, pcm: &[u8]) -> Result<()> {
        self.sink
            .send(Message::Binary(pcm.to_vec().into()))
            .await
            .map_err(|e| VoxloopError::Recognition {
                message: format!("audio write failed: {}", e),
            })
    }

    async fn finish(&mut self) -> Result<()> {
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| VoxloopError::Recognition {
                message: format!("close handshake failed: {}", e),
            })
    }
}

struct DeepgramTranscriptSource {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl TranscriptSource for DeepgramTranscriptSource {
    async fn next_event(&mut self) -> Result<Option<Transcript>> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => {
                    return Err(VoxloopError::Recognition {
                        message: format!("read failed: {}", e),
                    });
                }
                Some(Ok(Message::Text(raw))) => match parse_listen_message(raw.as_str()) {
                    Ok(Some(transcript)) => return Ok(Some(transcript)),
                    // Metadata and keepalive messages carry no alternatives.
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!(
                            "discarding unparseable transcript message ({}): {}",
                            e,
                            raw.as_str()
                        );
                    }
                },
                Some(Ok(Message::Close(_))) => return Ok(None),
                // The service speaks JSON text; ignore ping/pong/binary.
                Some(Ok(_)) => {}
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    #[serde(default)]
    channel: ListenChannel,
}

#[derive(Debug, Default, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
    #[serde(default)]
    is_final: bool,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

fn parse_listen_message(raw: &str) -> serde_json::Result<Option<Transcript>> {
    let response: ListenResponse = serde_json::from_str(raw)?;
    let Some(alternative) = response.channel.alternatives.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(Transcript {
        text: alternative.transcript,
        is_final: response.channel.is_final,
    }))
}
