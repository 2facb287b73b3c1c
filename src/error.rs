//! Error types for voxloop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxloopError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Missing required credential: {name} is not set")]
    MissingCredential { name: String },

    // Audio device errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // Collaborator errors
    #[error("Transcription stream error: {message}")]
    Recognition { message: String },

    #[error("Response generation failed: {message}")]
    Generation { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxloopError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_parse_display() {
        let error = VoxloopError::ConfigParse {
            message: "invalid TOML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration: invalid TOML syntax"
        );
    }

    #[test]
    fn test_missing_credential_display() {
        let error = VoxloopError::MissingCredential {
            name: "DEEPGRAM_API_KEY".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Missing required credential: DEEPGRAM_API_KEY is not set"
        );
    }

    #[test]
    fn test_audio_device_not_found_display() {
        let error = VoxloopError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_audio_capture_display() {
        let error = VoxloopError::AudioCapture {
            message: "stream stalled".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: stream stalled");
    }

    #[test]
    fn test_recognition_display() {
        let error = VoxloopError::Recognition {
            message: "socket closed unexpectedly".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription stream error: socket closed unexpectedly"
        );
    }

    #[test]
    fn test_generation_display() {
        let error = VoxloopError::Generation {
            message: "status 429".to_string(),
        };
        assert_eq!(error.to_string(), "Response generation failed: status 429");
    }

    #[test]
    fn test_synthesis_display() {
        let error = VoxloopError::Synthesis {
            message: "status 400: bad voice".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Speech synthesis failed: status 400: bad voice"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let error: VoxloopError = io_error.into();
        assert!(error.to_string().contains("file missing"));
    }

    #[test]
    fn test_other_display() {
        let error = VoxloopError::Other("something else".to_string());
        assert_eq!(error.to_string(), "something else");
    }
}
