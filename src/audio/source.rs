use crate::error::{Result, VoxloopError};

/// Trait for microphone capture devices.
///
/// This trait allows swapping implementations (real audio device vs mock).
pub trait MicSource: Send {
    /// Start capturing audio from the device.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing and release the device.
    fn stop(&mut self) -> Result<()>;

    /// Drain whatever samples the device has buffered since the last read.
    ///
    /// An empty result is normal while the device warms up; the caller keeps
    /// polling. An error is unrecoverable and ends capture.
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}

/// Mock microphone source for testing.
#[derive(Debug, Clone)]
pub struct MockMicSource {
    is_started: bool,
    samples: Vec<i16>,
    reads_before_silence: Option<u32>,
    reads_done: u32,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockMicSource {
    /// Create a new mock source that yields silence-sized sample chunks.
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0i16; 512],
            reads_before_silence: None,
            reads_done: 0,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the samples each read returns.
    pub fn with_samples(mut self, samples: Vec<i16>) -> Self {
        self.samples = samples;
        self
    }

    /// After `reads` successful reads, return empty buffers forever.
    pub fn with_reads_before_silence(mut self, reads: u32) -> Self {
        self.reads_before_silence = Some(reads);
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check whether the source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockMicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MicSource for MockMicSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(VoxloopError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(VoxloopError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        if let Some(limit) = self.reads_before_silence
            && self.reads_done >= limit
        {
            return Ok(Vec::new());
        }
        self.reads_done += 1;
        Ok(self.samples.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_samples() {
        let mut source = MockMicSource::new().with_samples(vec![100, 200, 300]);
        assert_eq!(source.read_samples().unwrap(), vec![100, 200, 300]);
    }

    #[test]
    fn mock_goes_silent_after_limit() {
        let mut source = MockMicSource::new()
            .with_samples(vec![1, 2])
            .with_reads_before_silence(2);
        assert_eq!(source.read_samples().unwrap(), vec![1, 2]);
        assert_eq!(source.read_samples().unwrap(), vec![1, 2]);
        assert!(source.read_samples().unwrap().is_empty());
        assert!(source.read_samples().unwrap().is_empty());
    }

    #[test]
    fn mock_start_stop_state() {
        let mut source = MockMicSource::new();
        assert!(!source.is_started());
        source.start().unwrap();
        assert!(source.is_started());
        source.stop().unwrap();
        assert!(!source.is_started());
    }

    #[test]
    fn mock_start_failure() {
        let mut source = MockMicSource::new()
            .with_start_failure()
            .with_error_message("device busy");
        match source.start() {
            Err(VoxloopError::AudioCapture { message }) => assert_eq!(message, "device busy"),
            other => panic!("expected AudioCapture error, got {:?}", other.is_ok()),
        }
        assert!(!source.is_started());
    }

    #[test]
    fn mock_read_failure() {
        let mut source = MockMicSource::new().with_read_failure();
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn trait_is_object_safe() {
        let mut source: Box<dyn MicSource> =
            Box::new(MockMicSource::new().with_samples(vec![7, 8, 9]));
        source.start().unwrap();
        assert_eq!(source.read_samples().unwrap(), vec![7, 8, 9]);
        source.stop().unwrap();
    }
}
