//! Speaker playback using CPAL.

use crate::audio::capture::with_suppressed_stderr;
use crate::defaults;
use crate::error::{Result, VoxloopError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for playing synthesized speech.
///
/// This trait allows swapping implementations (real output device vs mock).
/// Playback is bounded by the pipeline's cancellation token so a long reply
/// stops promptly on shutdown.
#[async_trait]
pub trait SpeechPlayer: Send + Sync {
    /// Play 16-bit PCM samples to completion, or until cancelled.
    async fn play(&self, samples: Vec<i16>, cancel: &CancellationToken) -> Result<()>;
}

/// Real speaker output implementation using CPAL.
pub struct CpalSpeechPlayer {
    device_name: Option<String>,
    sample_rate: u32,
}

impl CpalSpeechPlayer {
    /// Create a player on the named output device, or the system default.
    pub fn new(device_name: Option<&str>) -> Self {
        Self {
            device_name: device_name.map(str::to_string),
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

#[async_trait]
impl SpeechPlayer for CpalSpeechPlayer {
    async fn play(&self, samples: Vec<i16>, cancel: &CancellationToken) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let device_name = self.device_name.clone();
        let sample_rate = self.sample_rate;
        let cancel = cancel.clone();

        // cpal streams are !Send, so the whole playback runs on a blocking
        // thread that polls the token itself.
        tokio::task::spawn_blocking(move || {
            play_blocking(device_name.as_deref(), sample_rate, samples, &cancel)
        })
        .await
        .map_err(|e| VoxloopError::AudioPlayback {
            message: format!("playback task failed: {}", e),
        })?
    }
}

fn find_output_device(device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        match device_name {
            Some(name) => {
                let devices = host
                    .output_devices()
                    .map_err(|e| VoxloopError::AudioPlayback {
                        message: format!("Failed to enumerate output devices: {}", e),
                    })?;
                for device in devices {
                    if let Ok(dev_name) = device.name()
                        && dev_name == name
                    {
                        return Ok(device);
                    }
                }
                Err(VoxloopError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            }
            None => host
                .default_output_device()
                .ok_or_else(|| VoxloopError::AudioDeviceNotFound {
                    device: "default output".to_string(),
                }),
        }
    })
}

fn play_blocking(
    device_name: Option<&str>,
    sample_rate: u32,
    samples: Vec<i16>,
    cancel: &CancellationToken,
) -> Result<()> {
    let device = find_output_device(device_name)?;

    let config = cpal::StreamConfig {
        channels: defaults::CHANNELS,
        sample_rate: sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let queue = Arc::new(Mutex::new(VecDeque::from(samples)));
    let done = Arc::new(AtomicBool::new(false));

    let err_callback = |err| {
        log::warn!("audio output stream error: {}", err);
    };

    // i16 path first, f32 fallback, same ladder as capture.
    let stream = {
        let queue_i16 = Arc::clone(&queue);
        let done_i16 = Arc::clone(&done);
        let build = device.build_output_stream(
            &config,
            move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                if let Ok(mut q) = queue_i16.lock() {
                    for slot in out.iter_mut() {
                        *slot = q.pop_front().unwrap_or(0);
                    }
                    if q.is_empty() {
                        done_i16.store(true, Ordering::SeqCst);
                    }
                }
            },
            err_callback,
            None,
        );
        match build {
            Ok(stream) => stream,
            Err(_) => {
                let queue = Arc::clone(&queue);
                let done = Arc::clone(&done);
                device
                    .build_output_stream(
                        &config,
                        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            if let Ok(mut q) = queue.lock() {
                                for slot in out.iter_mut() {
                                    *slot = q.pop_front().unwrap_or(0) as f32 / i16::MAX as f32;
                                }
                                if q.is_empty() {
                                    done.store(true, Ordering::SeqCst);
                                }
                            }
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| VoxloopError::AudioPlayback {
                        message: format!("Failed to build output stream: {}", e),
                    })?
            }
        }
    };

    stream.play().map_err(|e| VoxloopError::AudioPlayback {
        message: format!("Failed to start output stream: {}", e),
    })?;

    while !done.load(Ordering::SeqCst) && !cancel.is_cancelled() {
        std::thread::sleep(Duration::from_millis(20));
    }

    // Let the device drain its last buffer before the stream drops.
    if !cancel.is_cancelled() {
        std::thread::sleep(Duration::from_millis(50));
    }

    Ok(())
}

/// Mock player for testing: records what it was asked to play.
#[derive(Clone, Default)]
pub struct MockSpeechPlayer {
    played: Arc<Mutex<Vec<Vec<i16>>>>,
    play_duration: Option<Duration>,
    should_fail: bool,
}

impl MockSpeechPlayer {
    /// Create a new mock player.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each play call take this long (cancellable).
    pub fn with_play_duration(mut self, duration: Duration) -> Self {
        self.play_duration = Some(duration);
        self
    }

    /// Configure the mock to fail on play.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// The sample buffers played so far.
    pub fn played(&self) -> Vec<Vec<i16>> {
        self.played
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SpeechPlayer for MockSpeechPlayer {
    async fn play(&self, samples: Vec<i16>, cancel: &CancellationToken) -> Result<()> {
        if self.should_fail {
            return Err(VoxloopError::AudioPlayback {
                message: "mock playback failure".to_string(),
            });
        }
        if let Some(duration) = self.play_duration {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(duration) => {}
            }
        }
        if let Ok(mut played) = self.played.lock() {
            played.push(samples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_played_samples() {
        let player = MockSpeechPlayer::new();
        let cancel = CancellationToken::new();
        player.play(vec![1, 2, 3], &cancel).await.unwrap();
        player.play(vec![4], &cancel).await.unwrap();
        assert_eq!(player.played(), vec![vec![1, 2, 3], vec![4]]);
    }

    #[tokio::test]
    async fn mock_failure_mode() {
        let player = MockSpeechPlayer::new().with_failure();
        let cancel = CancellationToken::new();
        assert!(player.play(vec![1], &cancel).await.is_err());
        assert!(player.played().is_empty());
    }

    #[tokio::test]
    async fn mock_play_stops_on_cancel() {
        let player = MockSpeechPlayer::new().with_play_duration(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Returns promptly instead of sleeping the full duration.
        player.play(vec![1, 2], &cancel).await.unwrap();
        assert!(player.played().is_empty());
    }
}
