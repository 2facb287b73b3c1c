//! Playback stage: synthesize each reply and speak it, suppressing
//! recognition of the assistant's own voice for the duration.

use crate::audio::codec;
use crate::audio::playback::SpeechPlayer;
use crate::audio::wav;
use crate::error::Result;
use crate::tts::Synthesizer;
use crate::turn::TurnCoordinator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs until cancelled or the reply queue closes.
///
/// `set_assistant_speaking(true)` is raised immediately before synthesis
/// and cleared immediately after playback, unconditionally, also on
/// collaborator error or cancellation, so the coordinator can never get
/// stuck in `AssistantSpeaking`. Synthesis and playback errors end the
/// stage (transport/device failures are fatal).
pub(crate) async fn run_speaker_stage(
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn SpeechPlayer>,
    coordinator: TurnCoordinator,
    mut reply_rx: mpsc::Receiver<String>,
    synthesis_wav: Option<PathBuf>,
    sample_rate: u32,
    channels: u16,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let reply = tokio::select! {
            _ = cancel.cancelled() => break,
            reply = reply_rx.recv() => match reply {
                Some(reply) => reply,
                None => break,
            },
        };

        log::info!("speaking reply: {:?}", reply);
        coordinator.set_assistant_speaking(true);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            result = speak_reply(
                synthesizer.as_ref(),
                player.as_ref(),
                &reply,
                synthesis_wav.as_deref(),
                sample_rate,
                channels,
                &cancel,
            ) => Some(result),
        };

        coordinator.set_assistant_speaking(false);

        match outcome {
            None => break,
            Some(Err(e)) => return Err(e),
            Some(Ok(())) => log::debug!("finished playback"),
        }
    }
    Ok(())
}

async fn speak_reply(
    synthesizer: &dyn Synthesizer,
    player: &dyn SpeechPlayer,
    reply: &str,
    synthesis_wav: Option<&Path>,
    sample_rate: u32,
    channels: u16,
    cancel: &CancellationToken,
) -> Result<()> {
    let audio = synthesizer.synthesize(reply).await?;
    let samples = codec::decode_samples(&audio);

    if let Some(path) = synthesis_wav
        && let Err(e) = wav::write_wav(path, sample_rate, channels, &samples)
    {
        log::warn!("synthesis log write failed: {}", e);
    }

    player.play(samples, cancel).await
}
