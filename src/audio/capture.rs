//! Microphone capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::MicSource;
use crate::defaults;
use crate::error::{Result, VoxloopError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
pub(crate) fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA messages that occur during audio backend probing.
///
/// # Safety
/// Modifies environment variables, which is safe when called at startup
/// before any threads are spawned.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice I/O).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

fn describe_devices(devices: impl Iterator<Item = cpal::Device>) -> Vec<String> {
    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                names.push(format!("{} [recommended]", name));
            } else {
                names.push(name);
            }
        }
    }
    names
}

/// List available audio input devices, filtered and with recommendations.
pub fn list_input_devices() -> Result<Vec<String>> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| VoxloopError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;
        Ok(describe_devices(devices))
    })
}

/// List available audio output devices, filtered and with recommendations.
pub fn list_output_devices() -> Result<Vec<String>> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| VoxloopError::AudioPlayback {
                message: format!("Failed to enumerate output devices: {}", e),
            })?;
        Ok(describe_devices(devices))
    })
}

/// Get the best default input device, preferring PipeWire/PulseAudio so
/// the desktop's device selection is respected.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| VoxloopError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Find an input device by its exact name.
fn find_input_device(name: &str) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| VoxloopError::AudioCapture {
            message: format!("Failed to enumerate devices: {}", e),
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
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched from one thread at a time through the
/// Mutex wrapper in `CpalMicSource`.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real microphone capture implementation using CPAL.
///
/// Captures 16-bit PCM at the pipeline rate (16kHz mono). Tries the i16
/// format first, then falls back to f32 with conversion. The callback
/// appends into a shared buffer that `read_samples` drains.
pub struct CpalMicSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalMicSource {
    /// Create a capture source on the named device, or the best default.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = match device_name {
            Some(name) => find_input_device(name)?,
            None => get_best_default_device()?,
        };

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            log::warn!("audio input stream error: {}", err);
        };

        // i16 path — PipeWire/PulseAudio convert transparently
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // f32 fallback — for devices that only expose float formats
        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| VoxloopError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl MicSource for CpalMicSource {
    fn start(&mut self) -> Result<()> {
        let stream = with_suppressed_stderr(|| self.build_stream())?;
        stream.play().map_err(|e| VoxloopError::AudioCapture {
            message: format!("Failed to start input stream: {}", e),
        })?;

        if let Ok(mut slot) = self.stream.lock() {
            *slot = Some(SendableStream(stream));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Ok(mut slot) = self.stream.lock() {
            // Dropping the stream stops capture and releases the device.
            slot.take();
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| VoxloopError::AudioCapture {
                message: "capture buffer lock poisoned".to_string(),
            })?;
        Ok(std::mem::take(&mut *buffer))
    }
}
