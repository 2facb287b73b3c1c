//! Data types that flow between pipeline stages.

/// A frame of raw audio samples.
///
/// Frames are fixed-size (see [`crate::defaults::FRAME_SAMPLES`]) and owned:
/// the producer hands each frame to exactly one consumer via the queue.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// PCM samples (16-bit signed integers).
    pub samples: Vec<i16>,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
}

impl AudioFrame {
    /// Creates a new audio frame.
    pub fn new(samples: Vec<i16>, sequence: u64) -> Self {
        Self { samples, sequence }
    }
}

/// One increment of recognition for the utterance in progress.
///
/// Multiple partials may precede one final, or a final may arrive directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Recognized text. May be empty.
    pub text: String,
    /// True for a completed recognition unit, false for an in-progress guess.
    pub is_final: bool,
}

impl Transcript {
    /// Creates a partial (in-progress) transcript.
    pub fn partial(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_final: false,
        }
    }

    /// Creates a final transcript.
    pub fn r#final(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_final: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_construction() {
        let frame = AudioFrame::new(vec![1, 2, 3], 7);
        assert_eq!(frame.samples, vec![1, 2, 3]);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn transcript_constructors() {
        assert!(!Transcript::partial("hel").is_final);
        assert!(Transcript::r#final("hello").is_final);
        assert_eq!(Transcript::r#final("hello").text, "hello");
    }
}
