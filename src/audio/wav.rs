//! WAV side-logs for captured microphone input and synthesized replies.
//!
//! These files are a debugging convenience, not part of the pipeline
//! contract: callers log write failures and keep going.

use crate::error::{Result, VoxloopError};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

fn wav_spec(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Incremental WAV writer used as the capture log.
///
/// Samples are appended frame by frame as they are produced; the header is
/// fixed up when the log is finalized (or dropped).
pub struct WavLog {
    writer: WavWriter<BufWriter<File>>,
    path: PathBuf,
}

impl WavLog {
    /// Creates (or truncates) a WAV log at `path`.
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        let writer = WavWriter::create(path, wav_spec(sample_rate, channels)).map_err(|e| {
            VoxloopError::Other(format!("failed to create {}: {}", path.display(), e))
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    /// Appends one frame of samples.
    pub fn append(&mut self, samples: &[i16]) -> Result<()> {
        for &sample in samples {
            self.writer.write_sample(sample).map_err(|e| {
                VoxloopError::Other(format!("failed to write {}: {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }

    /// Flushes the header and closes the file.
    pub fn finalize(self) -> Result<()> {
        let path = self.path;
        self.writer.finalize().map_err(|e| {
            VoxloopError::Other(format!("failed to finalize {}: {}", path.display(), e))
        })
    }

    /// Path this log writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes a complete sample buffer as a WAV file in one shot.
///
/// Used for the synthesized-reply log, which arrives as a whole buffer.
pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) -> Result<()> {
    let mut writer = WavWriter::create(path, wav_spec(sample_rate, channels))
        .map_err(|e| VoxloopError::Other(format!("failed to create {}: {}", path.display(), e)))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| VoxloopError::Other(format!("failed to write {}: {}", path.display(), e)))?;
    }
    writer
        .finalize()
        .map_err(|e| VoxloopError::Other(format!("failed to finalize {}: {}", path.display(), e)))
}
