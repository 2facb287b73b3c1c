//! Pipeline orchestrator: owns the queues, spawns every stage as an
//! independent task, and ties them together with one cancellation token.
//!
//! Stage graph:
//! Capture → (frames) → Transcription → (transcripts) → Turn coordinator
//! → (utterances) → Response → (replies) → Playback, with a feedback edge
//! from Playback into the coordinator (assistant-speaking suppression).

use crate::audio::playback::SpeechPlayer;
use crate::audio::source::MicSource;
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::llm::Responder;
use crate::pipeline::capture::run_capture_stage;
use crate::pipeline::recognizer::run_recognizer_stage;
use crate::pipeline::responder::run_responder_stage;
use crate::pipeline::speaker::run_speaker_stage;
use crate::pipeline::types::{AudioFrame, Transcript};
use crate::stt::Recognizer;
use crate::tts::Synthesizer;
use crate::turn::TurnCoordinator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sample rate shared by capture, transcription, synthesis, playback.
    pub sample_rate: u32,
    /// Channel count (the pipeline is mono).
    pub channels: u16,
    /// Samples per captured frame.
    pub frame_samples: usize,
    /// Silence after the last final transcript before an utterance commits.
    pub grace_period: Duration,
    /// Queue capacities.
    pub frame_queue: usize,
    pub transcript_queue: usize,
    pub utterance_queue: usize,
    pub reply_queue: usize,
    /// Optional WAV side-log of captured microphone input.
    pub capture_wav: Option<PathBuf>,
    /// Optional WAV side-log of the last synthesized reply.
    pub synthesis_wav: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            frame_samples: defaults::FRAME_SAMPLES,
            grace_period: Duration::from_millis(defaults::GRACE_PERIOD_MS),
            frame_queue: defaults::FRAME_QUEUE,
            transcript_queue: defaults::TRANSCRIPT_QUEUE,
            utterance_queue: defaults::UTTERANCE_QUEUE,
            reply_queue: defaults::REPLY_QUEUE,
            capture_wav: None,
            synthesis_wav: None,
        }
    }
}

impl PipelineConfig {
    /// Builds a pipeline configuration from the app config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_rate: config.audio.sample_rate,
            frame_samples: config.audio.frame_samples,
            grace_period: Duration::from_millis(config.turn.grace_period_ms),
            capture_wav: config.audio.capture_wav.clone(),
            synthesis_wav: config.audio.synthesis_wav.clone(),
            ..Default::default()
        }
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    cancel: CancellationToken,
    tasks: JoinSet<(&'static str, Result<()>)>,
}

impl PipelineHandle {
    /// The pipeline's cancellation token. Cancelling it starts shutdown.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown without waiting for it.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the pipeline to finish.
    ///
    /// Any stage exit is terminal: the first one triggers cancellation of
    /// the rest, then every task is drained. Returns the first stage error,
    /// if any. Stages are never restarted.
    pub async fn join(mut self) -> Result<()> {
        let mut first_error: Option<VoxloopError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((stage, Ok(()))) => log::debug!("{} stage finished", stage),
                Ok((stage, Err(e))) => {
                    log::error!("{} stage failed: {}", stage, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    log::error!("stage task panicked: {}", e);
                    if first_error.is_none() {
                        first_error =
                            Some(VoxloopError::Other(format!("stage task panicked: {}", e)));
                    }
                }
            }
            // One stage down means the conversation is over; drain the rest.
            self.cancel.cancel();
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// The conversation pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a new pipeline.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Starts every stage and returns a handle to supervise them.
    ///
    /// # Arguments
    /// * `mic` - microphone capture device
    /// * `recognizer` - streaming transcription collaborator
    /// * `responder` - response-generation collaborator
    /// * `synthesizer` - speech-synthesis collaborator
    /// * `player` - speaker output device
    pub fn start(
        self,
        mic: Box<dyn MicSource>,
        recognizer: Arc<dyn Recognizer>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn SpeechPlayer>,
    ) -> PipelineHandle {
        let config = self.config;
        let cancel = CancellationToken::new();

        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(config.frame_queue);
        let (transcript_tx, transcript_rx) = mpsc::channel::<Transcript>(config.transcript_queue);
        let (utterance_tx, utterance_rx) = mpsc::channel::<String>(config.utterance_queue);
        let (reply_tx, reply_rx) = mpsc::channel::<String>(config.reply_queue);

        let coordinator = TurnCoordinator::new(config.grace_period, utterance_tx);

        let mut tasks: JoinSet<(&'static str, Result<()>)> = JoinSet::new();

        {
            let cancel = cancel.clone();
            let frame_samples = config.frame_samples;
            let capture_wav = config.capture_wav.clone();
            let sample_rate = config.sample_rate;
            let channels = config.channels;
            tasks.spawn(async move {
                (
                    "capture",
                    run_capture_stage(
                        mic,
                        frame_tx,
                        frame_samples,
                        capture_wav,
                        sample_rate,
                        channels,
                        cancel,
                    )
                    .await,
                )
            });
        }

        {
            let cancel = cancel.clone();
            tasks.spawn(async move {
                (
                    "transcription",
                    run_recognizer_stage(recognizer, frame_rx, transcript_tx, cancel).await,
                )
            });
        }

        {
            let cancel = cancel.clone();
            let coordinator = coordinator.clone();
            tasks.spawn(async move {
                coordinator.run(transcript_rx, cancel).await;
                ("turn", Ok(()))
            });
        }

        {
            let cancel = cancel.clone();
            tasks.spawn(async move {
                (
                    "response",
                    run_responder_stage(responder, utterance_rx, reply_tx, cancel).await,
                )
            });
        }

        {
            let cancel = cancel.clone();
            let synthesis_wav = config.synthesis_wav.clone();
            let sample_rate = config.sample_rate;
            let channels = config.channels;
            tasks.spawn(async move {
                (
                    "playback",
                    run_speaker_stage(
                        synthesizer,
                        player,
                        coordinator,
                        reply_rx,
                        synthesis_wav,
                        sample_rate,
                        channels,
                        cancel,
                    )
                    .await,
                )
            });
        }

        PipelineHandle { cancel, tasks }
    }
}
