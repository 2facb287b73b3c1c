use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub turn: TurnConfig,
    pub recognizer: RecognizerConfig,
    pub responder: ResponderConfig,
    pub speaker: SpeakerConfig,
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; None picks the best default.
    pub input_device: Option<String>,
    /// Output device name; None picks the system default.
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub frame_samples: usize,
    /// WAV side-log of captured microphone input, if set.
    pub capture_wav: Option<PathBuf>,
    /// WAV side-log of the last synthesized reply, if set.
    pub synthesis_wav: Option<PathBuf>,
}

/// Turn-taking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TurnConfig {
    /// Silence after the last final transcript before an utterance commits.
    pub grace_period_ms: u64,
}

/// Streaming transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognizerConfig {
    pub model: String,
    pub endpoint: String,
}

/// Response generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponderConfig {
    pub model: String,
    pub endpoint: String,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeakerConfig {
    pub voice: String,
    pub endpoint: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_samples: defaults::FRAME_SAMPLES,
            capture_wav: None,
            synthesis_wav: None,
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: defaults::GRACE_PERIOD_MS,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model: defaults::RECOGNIZER_MODEL.to_string(),
            endpoint: defaults::RECOGNIZER_ENDPOINT.to_string(),
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            model: defaults::RESPONDER_MODEL.to_string(),
            endpoint: defaults::RESPONDER_ENDPOINT.to_string(),
        }
    }
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            voice: defaults::SPEAKER_VOICE.to_string(),
            endpoint: defaults::SPEAKER_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults when the file is missing; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXLOOP_INPUT_DEVICE → audio.input_device
    /// - VOXLOOP_OUTPUT_DEVICE → audio.output_device
    /// - VOXLOOP_STT_MODEL → recognizer.model
    /// - VOXLOOP_LLM_MODEL → responder.model
    /// - VOXLOOP_VOICE → speaker.voice
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("VOXLOOP_INPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.input_device = Some(device);
        }

        if let Ok(device) = std::env::var("VOXLOOP_OUTPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.output_device = Some(device);
        }

        if let Ok(model) = std::env::var("VOXLOOP_STT_MODEL")
            && !model.is_empty()
        {
            self.recognizer.model = model;
        }

        if let Ok(model) = std::env::var("VOXLOOP_LLM_MODEL")
            && !model.is_empty()
        {
            self.responder.model = model;
        }

        if let Ok(voice) = std::env::var("VOXLOOP_VOICE")
            && !voice.is_empty()
        {
            self.speaker.voice = voice;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxloop/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxloop")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.frame_samples, 1024);
        assert!(config.audio.input_device.is_none());
        assert_eq!(config.turn.grace_period_ms, 1500);
        assert_eq!(config.recognizer.model, "nova-2-general");
        assert_eq!(config.responder.model, "gpt-4o-mini");
        assert_eq!(config.speaker.voice, "aura-asteria");
        assert!(config.recognizer.endpoint.starts_with("wss://"));
        assert!(config.responder.endpoint.starts_with("https://"));
        assert!(config.speaker.endpoint.starts_with("https://"));
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let toml_str = r#"
            [turn]
            grace_period_ms = 800

            [speaker]
            voice = "aura-luna"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.turn.grace_period_ms, 800);
        assert_eq!(config.speaker.voice, "aura-luna");
        // Untouched sections keep their defaults.
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.recognizer.model, "nova-2-general");
    }

    #[test]
    fn load_missing_file_is_default() {
        let config = Config::load_or_default(Path::new("/nonexistent/voxloop.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is { not toml").unwrap();
        assert!(Config::load_or_default(&path).is_err());
    }

    #[test]
    fn load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.turn.grace_period_ms = 2000;
        config.audio.input_device = Some("pipewire".to_string());
        fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn default_path_ends_with_crate_config() {
        let path = Config::default_path();
        assert!(path.ends_with("voxloop/config.toml"));
    }
}
