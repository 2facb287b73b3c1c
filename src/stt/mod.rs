//! Streaming speech recognition.
//!
//! The recognizer keeps one persistent session per pipeline run. A session
//! is split into two halves so audio forwarding and event reading can run
//! as concurrent duties over the same connection.

pub mod deepgram;

use crate::error::{Result, VoxloopError};
use crate::pipeline::types::Transcript;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A connected recognition session, split into its two directions.
pub struct RecognizerSession {
    /// Audio-in half: frames are written here as they arrive.
    pub audio: Box<dyn AudioSink>,
    /// Events-out half: transcripts are read here as they arrive.
    pub events: Box<dyn TranscriptSource>,
}

/// Trait for streaming speech recognizers.
///
/// This trait allows swapping implementations (live service vs mock).
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Open one session for the lifetime of the pipeline run.
    async fn connect(&self) -> Result<RecognizerSession>;
}

/// Audio-in half of a recognition session.
#[async_trait]
pub trait AudioSink: Send {
    /// Forward one frame of encoded PCM to the service.
    async fn send_audio(&mut self, pcm: &[u8]) -> Result<()>;

    /// Graceful close handshake: tell the service no more audio is coming.
    async fn finish(&mut self) -> Result<()>;
}

/// Events-out half of a recognition session.
#[async_trait]
pub trait TranscriptSource: Send {
    /// Next transcript in arrival order.
    ///
    /// `Ok(None)` means the stream ended cleanly; an error is fatal to the
    /// session.
    async fn next_event(&mut self) -> Result<Option<Transcript>>;
}

/// Mock recognizer for testing: plays back a scripted event sequence.
#[derive(Clone)]
pub struct MockRecognizer {
    events: Vec<Transcript>,
    event_gap: Duration,
    end_stream: bool,
    fail_connect: bool,
    frames_sent: Arc<AtomicUsize>,
}

impl MockRecognizer {
    /// Create a mock with no scripted events that holds its stream open.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            event_gap: Duration::from_millis(5),
            end_stream: false,
            fail_connect: false,
            frames_sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the transcripts the session will emit, in order.
    pub fn with_events(mut self, events: Vec<Transcript>) -> Self {
        self.events = events;
        self
    }

    /// Delay between scripted events.
    pub fn with_event_gap(mut self, gap: Duration) -> Self {
        self.event_gap = gap;
        self
    }

    /// End the stream after the last scripted event instead of holding it
    /// open (models a dropped connection / remote end-of-stream).
    pub fn with_stream_end(mut self) -> Self {
        self.end_stream = true;
        self
    }

    /// Configure the mock to fail on connect.
    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Number of audio frames the session has received.
    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn connect(&self) -> Result<RecognizerSession> {
        if self.fail_connect {
            return Err(VoxloopError::Recognition {
                message: "mock connect failure".to_string(),
            });
        }
        Ok(RecognizerSession {
            audio: Box::new(MockAudioSink {
                frames_sent: Arc::clone(&self.frames_sent),
            }),
            events: Box::new(MockTranscriptSource {
                events: self.events.clone().into(),
                event_gap: self.event_gap,
                end_stream: self.end_stream,
            }),
        })
    }
}

struct MockAudioSink {
    frames_sent: Arc<AtomicUsize>,
}

#[async_trait]
impl AudioSink for MockAudioSink {
    async fn send_audio(&mut self, _pcm: &[u8]) -> Result<()> {
        self.frames_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

struct MockTranscriptSource {
    events: VecDeque<Transcript>,
    event_gap: Duration,
    end_stream: bool,
}

#[async_trait]
impl TranscriptSource for MockTranscriptSource {
    async fn next_event(&mut self) -> Result<Option<Transcript>> {
        match self.events.pop_front() {
            Some(event) => {
                tokio::time::sleep(self.event_gap).await;
                Ok(Some(event))
            }
            None if self.end_stream => Ok(None),
            None => {
                // A live session stays open between utterances; pend until
                // the caller's cancellation race drops this future.
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_plays_back_scripted_events() {
        let recognizer = MockRecognizer::new()
            .with_events(vec![
                Transcript::partial("hel"),
                Transcript::r#final("hello"),
            ])
            .with_event_gap(Duration::from_millis(1))
            .with_stream_end();

        let mut session = recognizer.connect().await.unwrap();
        assert_eq!(
            session.events.next_event().await.unwrap(),
            Some(Transcript::partial("hel"))
        );
        assert_eq!(
            session.events.next_event().await.unwrap(),
            Some(Transcript::r#final("hello"))
        );
        assert_eq!(session.events.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn mock_counts_forwarded_frames() {
        let recognizer = MockRecognizer::new().with_stream_end();
        let mut session = recognizer.connect().await.unwrap();
        session.audio.send_audio(&[0, 1]).await.unwrap();
        session.audio.send_audio(&[2, 3]).await.unwrap();
        session.audio.finish().await.unwrap();
        assert_eq!(recognizer.frames_sent(), 2);
    }

    #[tokio::test]
    async fn mock_connect_failure() {
        let recognizer = MockRecognizer::new().with_connect_failure();
        assert!(recognizer.connect().await.is_err());
    }

    #[tokio::test]
    async fn mock_holds_stream_open_by_default() {
        let recognizer = MockRecognizer::new();
        let mut session = recognizer.connect().await.unwrap();
        let next = session.events.next_event();
        // Without with_stream_end the source pends rather than ending.
        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), next).await.is_err();
        assert!(timed_out);
    }
}
