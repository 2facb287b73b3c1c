//! Default configuration constants for voxloop.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and is the rate the
/// transcription and synthesis services are asked to use, so no resampling
/// happens anywhere in the pipeline.
pub const SAMPLE_RATE: u32 = 16000;

/// Number of audio channels. The whole pipeline is mono.
pub const CHANNELS: u16 = 1;

/// Samples per captured audio frame.
///
/// At 16kHz mono this is 64ms of audio per frame, a good balance between
/// send overhead on the transcription socket and capture latency.
pub const FRAME_SAMPLES: usize = 1024;

/// Interval between polls of the capture device buffer, in milliseconds.
pub const CAPTURE_POLL_MS: u64 = 16;

/// Default grace period in milliseconds.
///
/// Silence that must follow the last final transcript before buffered text
/// is committed as one utterance. 1500ms absorbs the mid-sentence "final"
/// segments streaming recognizers emit at punctuation-level pauses.
pub const GRACE_PERIOD_MS: u64 = 1500;

/// Capacity of the capture → transcription frame queue.
pub const FRAME_QUEUE: usize = 32;

/// Capacity of the transcription → turn-coordinator transcript queue.
pub const TRANSCRIPT_QUEUE: usize = 32;

/// Capacity of the coordinator → response-stage utterance queue.
///
/// The debounce flush never blocks on this queue; when it is full the
/// utterance is dropped and logged instead.
pub const UTTERANCE_QUEUE: usize = 8;

/// Capacity of the response → playback reply queue.
pub const REPLY_QUEUE: usize = 8;

/// Default streaming transcription endpoint.
pub const RECOGNIZER_ENDPOINT: &str = "wss://api.deepgram.com/v1/listen";

/// Default transcription model.
pub const RECOGNIZER_MODEL: &str = "nova-2-general";

/// Default chat-completion endpoint.
pub const RESPONDER_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default chat model.
pub const RESPONDER_MODEL: &str = "gpt-4o-mini";

/// Default speech-synthesis endpoint.
pub const SPEAKER_ENDPOINT: &str = "https://api.deepgram.com/v1/speak";

/// Default synthesis voice.
pub const SPEAKER_VOICE: &str = "aura-asteria";

/// Environment variable holding the transcription/synthesis credential.
pub const DEEPGRAM_KEY_VAR: &str = "DEEPGRAM_API_KEY";

/// Environment variable holding the response-generation credential.
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
