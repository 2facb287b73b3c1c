//! Audio I/O: frame codec, microphone capture, speaker playback, WAV logs.

pub mod capture;
pub mod codec;
pub mod playback;
pub mod source;
pub mod wav;
