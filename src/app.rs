//! Composition root: credentials, collaborators, and the run loop.

use crate::audio::capture::{self, CpalMicSource, suppress_audio_warnings};
use crate::audio::playback::{CpalSpeechPlayer, SpeechPlayer};
use crate::audio::{codec, wav};
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::llm::openai::OpenAiResponder;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::stt::deepgram::DeepgramRecognizer;
use crate::tts::Synthesizer;
use crate::tts::deepgram::DeepgramSynthesizer;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Credentials read from the process environment at startup.
///
/// Missing either one is an immediate error; no device or network is
/// touched first.
pub struct Credentials {
    pub deepgram_api_key: String,
    pub openai_api_key: String,
}

impl Credentials {
    /// Read both required credentials, failing on the first missing one.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            deepgram_api_key: require_env(defaults::DEEPGRAM_KEY_VAR)?,
            openai_api_key: require_env(defaults::OPENAI_KEY_VAR)?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(VoxloopError::MissingCredential {
            name: name.to_string(),
        }),
    }
}

/// Run the conversation loop until interrupted.
pub async fn run_conversation(
    config: Config,
    device: Option<String>,
    grace_period: Option<std::time::Duration>,
    quiet: bool,
    verbosity: u8,
) -> Result<()> {
    let credentials = Credentials::from_env()?;
    suppress_audio_warnings();

    let mut pipeline_config = PipelineConfig::from_config(&config);
    if let Some(grace) = grace_period {
        pipeline_config.grace_period = grace;
    }
    if verbosity >= 2 {
        log::debug!("pipeline config: {:?}", pipeline_config);
    }

    let input_device = device.or_else(|| config.audio.input_device.clone());
    let mic = Box::new(CpalMicSource::new(input_device.as_deref())?);

    let recognizer = Arc::new(
        DeepgramRecognizer::new(&credentials.deepgram_api_key)
            .with_endpoint(&config.recognizer.endpoint)
            .with_model(&config.recognizer.model),
    );
    let responder = Arc::new(
        OpenAiResponder::new(&credentials.openai_api_key)
            .with_endpoint(&config.responder.endpoint)
            .with_model(&config.responder.model),
    );
    let synthesizer = Arc::new(
        DeepgramSynthesizer::new(&credentials.deepgram_api_key)
            .with_endpoint(&config.speaker.endpoint)
            .with_voice(&config.speaker.voice),
    );
    let player = Arc::new(CpalSpeechPlayer::new(config.audio.output_device.as_deref()));

    let handle = Pipeline::new(pipeline_config).start(mic, recognizer, responder, synthesizer, player);

    if !quiet {
        eprintln!("{}", "Microphone started. Speak now (Ctrl+C to exit).".green());
    }

    let cancel = handle.cancellation();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        eprintln!();
        log::info!("shutdown requested");
        cancel.cancel();
    });

    let result = handle.join().await;
    if !quiet {
        match &result {
            Ok(()) => eprintln!("{}", "Shutdown complete.".green()),
            Err(e) => eprintln!("{} {}", "Pipeline stopped:".red(), e),
        }
    }
    result
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM (used by systemd).
async fn wait_for_shutdown_signal() {
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log::warn!("failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        _ = sigterm => {}
    }
}

/// One-shot synthesis check: speak a line of text and exit.
///
/// Only the synthesis credential is required.
pub async fn run_say(config: Config, text: &str, quiet: bool) -> Result<()> {
    let api_key = require_env(defaults::DEEPGRAM_KEY_VAR)?;
    suppress_audio_warnings();

    let synthesizer = DeepgramSynthesizer::new(&api_key)
        .with_endpoint(&config.speaker.endpoint)
        .with_voice(&config.speaker.voice);

    if !quiet {
        eprintln!("Synthesizing {:?}...", text);
    }
    let audio = synthesizer.synthesize(text).await?;
    let samples = codec::decode_samples(&audio);

    if let Some(path) = config.audio.synthesis_wav.as_deref()
        && let Err(e) = wav::write_wav(path, config.audio.sample_rate, defaults::CHANNELS, &samples)
    {
        log::warn!("synthesis log write failed: {}", e);
    }

    let player = CpalSpeechPlayer::new(config.audio.output_device.as_deref());
    player.play(samples, &CancellationToken::new()).await?;

    if !quiet {
        eprintln!("{}", "Done.".green());
    }
    Ok(())
}

/// Print available audio devices.
pub fn run_devices() -> Result<()> {
    suppress_audio_warnings();

    println!("{}", "Input devices:".bold());
    for name in capture::list_input_devices()? {
        println!("  {}", name);
    }
    println!("{}", "Output devices:".bold());
    for name in capture::list_output_devices()? {
        println!("  {}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them serialized by testing
    // distinct variable names per test.

    #[test]
    fn require_env_missing_is_an_error() {
        match require_env("VOXLOOP_TEST_UNSET_VAR") {
            Err(VoxloopError::MissingCredential { name }) => {
                assert_eq!(name, "VOXLOOP_TEST_UNSET_VAR");
            }
            other => panic!("expected MissingCredential, got ok={}", other.is_ok()),
        }
    }

    #[test]
    fn require_env_blank_is_an_error() {
        // SAFETY: test-local variable name, no concurrent reader
        unsafe { std::env::set_var("VOXLOOP_TEST_BLANK_VAR", "  ") };
        assert!(require_env("VOXLOOP_TEST_BLANK_VAR").is_err());
        unsafe { std::env::remove_var("VOXLOOP_TEST_BLANK_VAR") };
    }

    #[test]
    fn require_env_present_is_returned() {
        // SAFETY: test-local variable name, no concurrent reader
        unsafe { std::env::set_var("VOXLOOP_TEST_SET_VAR", "secret") };
        assert_eq!(require_env("VOXLOOP_TEST_SET_VAR").unwrap(), "secret");
        unsafe { std::env::remove_var("VOXLOOP_TEST_SET_VAR") };
    }
}
