//! Capture stage: polls the microphone and produces fixed-size frames.

use crate::audio::source::MicSource;
use crate::audio::wav::WavLog;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::types::AudioFrame;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs until cancelled, the frame queue closes, or the device fails.
///
/// Each produced frame is also appended to the WAV capture log when one is
/// configured; log failures are logged and never affect the pipeline. A
/// device read error is unrecoverable: it is returned to the orchestrator,
/// not retried.
pub(crate) async fn run_capture_stage(
    mut mic: Box<dyn MicSource>,
    frame_tx: mpsc::Sender<AudioFrame>,
    frame_samples: usize,
    capture_wav: Option<PathBuf>,
    sample_rate: u32,
    channels: u16,
    cancel: CancellationToken,
) -> Result<()> {
    mic.start()?;
    log::info!("microphone capture started");

    let mut wav_log = capture_wav.and_then(|path| {
        match WavLog::create(&path, sample_rate, channels) {
            Ok(log) => {
                log::info!("writing capture log to {}", path.display());
                Some(log)
            }
            Err(e) => {
                log::warn!("capture log disabled: {}", e);
                None
            }
        }
    });

    let mut poll = tokio::time::interval(Duration::from_millis(defaults::CAPTURE_POLL_MS));
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut pending: Vec<i16> = Vec::new();
    let mut sequence: u64 = 0;
    let mut result: Result<()> = Ok(());

    'run: loop {
        tokio::select! {
            _ = cancel.cancelled() => break 'run,
            _ = poll.tick() => {}
        }

        let samples = match mic.read_samples() {
            Ok(samples) => samples,
            Err(e) => {
                result = Err(e);
                break 'run;
            }
        };
        if samples.is_empty() {
            // Normal while the device warms up; keep polling.
            continue;
        }

        pending.extend_from_slice(&samples);
        while pending.len() >= frame_samples {
            let rest = pending.split_off(frame_samples);
            let chunk = std::mem::replace(&mut pending, rest);

            if let Some(log) = wav_log.as_mut()
                && let Err(e) = log.append(&chunk)
            {
                log::warn!("capture log write failed: {}", e);
            }

            let frame = AudioFrame::new(chunk, sequence);
            sequence += 1;

            tokio::select! {
                _ = cancel.cancelled() => break 'run,
                sent = frame_tx.send(frame) => {
                    if sent.is_err() {
                        // Downstream closed; chain shutdown.
                        break 'run;
                    }
                }
            }
        }
    }

    if let Some(log) = wav_log.take()
        && let Err(e) = log.finalize()
    {
        log::warn!("capture log finalize failed: {}", e);
    }
    if let Err(e) = mic.stop() {
        log::warn!("failed to stop microphone: {}", e);
    }
    log::info!("microphone capture stopped");
    result
}
