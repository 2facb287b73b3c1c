//! Conversion between raw sample buffers and the little-endian 16-bit PCM
//! byte encoding used by the capture device and the transcription transport.

/// Encodes 16-bit PCM samples as little-endian bytes.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Decodes little-endian bytes into 16-bit PCM samples.
///
/// An odd-length buffer is valid input: the dangling final byte is truncated.
pub fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_little_endian() {
        let bytes = encode_samples(&[0x0102, -1]);
        assert_eq!(bytes, vec![0x02, 0x01, 0xFF, 0xFF]);
    }

    #[test]
    fn decode_matches_known_bytes() {
        let samples = decode_samples(&[0x02, 0x01, 0xFF, 0xFF]);
        assert_eq!(samples, vec![0x0102, -1]);
    }

    #[test]
    fn round_trip_preserves_samples() {
        let samples = vec![0i16, 1, -1, i16::MAX, i16::MIN, 12345, -12345];
        assert_eq!(decode_samples(&encode_samples(&samples)), samples);
    }

    #[test]
    fn decode_truncates_dangling_byte() {
        let samples = decode_samples(&[0x02, 0x01, 0xAB]);
        assert_eq!(samples, vec![0x0102]);
    }

    #[test]
    fn decode_single_byte_is_empty() {
        assert_eq!(decode_samples(&[0x7F]), Vec::<i16>::new());
    }

    #[test]
    fn empty_buffers() {
        assert_eq!(encode_samples(&[]), Vec::<u8>::new());
        assert_eq!(decode_samples(&[]), Vec::<i16>::new());
    }
}
