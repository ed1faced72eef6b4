pub mod monospace;
pub mod threespace;

use clap::ValueEnum;

use crate::config;
use crate::error::VidbyteError;

/// Pixel-encoding strategy trading data density for tolerance to color
/// distortion in the outer video transport.
///
/// Density order: fullspace (1 byte/channel) > threespace (3 bits/pixel) >
/// monospace (1 bit/pixel). Fullspace assumes the transport round-trips
/// pixel values exactly; the other two survive bounded drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SafetyMode {
    Monospace,
    Threespace,
    #[default]
    Fullspace,
}

/// Average intensity buckets used to recognize a marker pixel. Disjoint by
/// construction; an average outside all three is an unrecoverable input.
const DETECTION_RANGES: [(f64, f64, SafetyMode); 3] = [
    (0.0, 32.0, SafetyMode::Monospace),
    (96.0, 160.0, SafetyMode::Fullspace),
    (192.0, 255.0, SafetyMode::Threespace),
];

impl SafetyMode {
    /// Transform payload bytes into pixel bytes.
    pub fn encode(self, data: &[u8]) -> Vec<u8> {
        match self {
            SafetyMode::Fullspace => data.to_vec(),
            SafetyMode::Monospace => monospace::encode(data),
            SafetyMode::Threespace => threespace::encode(data),
        }
    }

    /// Exact length `encode` produces for `raw_size` input bytes.
    pub fn encoded_size(self, raw_size: u64) -> u64 {
        match self {
            SafetyMode::Fullspace => raw_size,
            SafetyMode::Monospace => raw_size * 24,
            SafetyMode::Threespace => (raw_size * 8).div_ceil(3) * 3,
        }
    }

    /// Recover payload bytes from pixel bytes. Returns exactly `expected`
    /// bytes, or fewer if `pixels` was truncated.
    pub fn decode(self, pixels: &[u8], expected: usize) -> Vec<u8> {
        match self {
            SafetyMode::Fullspace => pixels[..pixels.len().min(expected)].to_vec(),
            SafetyMode::Monospace => monospace::decode(pixels, expected),
            SafetyMode::Threespace => threespace::decode(pixels, expected),
        }
    }

    /// The fixed pixel written ahead of the header so decode can identify
    /// the mode without out-of-band knowledge.
    pub fn marker(self) -> [u8; config::SAFETY_MARKER_SIZE] {
        match self {
            SafetyMode::Monospace => [0, 0, 0],
            SafetyMode::Fullspace => [128, 128, 128],
            SafetyMode::Threespace => [255, 255, 255],
        }
    }

    /// Classify a marker pixel by its average channel intensity.
    pub fn detect(pixel: [u8; config::SAFETY_MARKER_SIZE]) -> Result<Self, VidbyteError> {
        let [r, g, b] = pixel;
        let avg = (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0;
        for &(min, max, mode) in &DETECTION_RANGES {
            if avg >= min && avg <= max {
                return Ok(mode);
            }
        }
        Err(VidbyteError::UnrecognizedSafetyMarker { r, g, b, avg })
    }

    /// Smallest encoded-byte granularity at which `decode` holds no state
    /// between calls: 24 bytes is one output byte for monospace and eight
    /// pixels (three whole output bytes) for threespace.
    pub fn atom_size(self) -> usize {
        match self {
            SafetyMode::Fullspace => 1,
            SafetyMode::Monospace | SafetyMode::Threespace => 24,
        }
    }
}

/// Incremental decoding over a chunked pixel stream.
///
/// Buffers at most one incomplete atom between chunks, so memory stays
/// bounded by the chunk size and the result matches a whole-buffer decode.
#[derive(Debug)]
pub struct StreamDecoder {
    mode: SafetyMode,
    carry: Vec<u8>,
    expected: u64,
    produced: u64,
}

impl StreamDecoder {
    pub fn new(mode: SafetyMode, expected: u64) -> Self {
        Self {
            mode,
            carry: Vec::new(),
            expected,
            produced: 0,
        }
    }

    /// Feed encoded bytes; returns the payload bytes decodable so far.
    pub fn push(&mut self, encoded: &[u8]) -> Vec<u8> {
        self.carry.extend_from_slice(encoded);
        let atom = self.mode.atom_size();
        let aligned = self.carry.len() / atom * atom;
        if aligned == 0 {
            return Vec::new();
        }
        let remaining = (self.expected - self.produced) as usize;
        let out = self.mode.decode(&self.carry[..aligned], remaining);
        self.carry.drain(..aligned);
        self.produced += out.len() as u64;
        out
    }

    /// Decode the trailing partial atom, if any. Call once the exact number
    /// of encoded payload bytes has been fed.
    pub fn finish(&mut self) -> Vec<u8> {
        if self.carry.is_empty() || self.produced >= self.expected {
            self.carry.clear();
            return Vec::new();
        }
        let remaining = (self.expected - self.produced) as usize;
        let out = self.mode.decode(&self.carry, remaining);
        self.carry.clear();
        self.produced += out.len() as u64;
        out
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [SafetyMode; 3] = [
        SafetyMode::Monospace,
        SafetyMode::Threespace,
        SafetyMode::Fullspace,
    ];

    fn sample_payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 37 % 256) as u8).collect()
    }

    #[test]
    fn test_roundtrip_all_modes() {
        for mode in ALL_MODES {
            for len in [0usize, 1, 2, 3, 7, 8, 100, 1024] {
                let payload = sample_payload(len);
                let encoded = mode.encode(&payload);
                let decoded = mode.decode(&encoded, len);
                assert_eq!(decoded, payload, "mode {mode:?} len {len}");
            }
        }
    }

    #[test]
    fn test_encoded_size_matches_encode_output() {
        for mode in ALL_MODES {
            for len in 0..=64usize {
                let payload = sample_payload(len);
                assert_eq!(
                    mode.encode(&payload).len() as u64,
                    mode.encoded_size(len as u64),
                    "mode {mode:?} len {len}"
                );
            }
        }
    }

    #[test]
    fn test_density_formulas() {
        for n in 0..100u64 {
            assert_eq!(SafetyMode::Monospace.encoded_size(n), 24 * n);
            assert_eq!(
                SafetyMode::Threespace.encoded_size(n),
                3 * (8 * n).div_ceil(3)
            );
            assert_eq!(SafetyMode::Fullspace.encoded_size(n), n);
        }
        assert_eq!(SafetyMode::Threespace.encoded_size(10), 81);
    }

    #[test]
    fn test_threespace_ten_byte_scenario() {
        let payload = sample_payload(10);
        let encoded = SafetyMode::Threespace.encode(&payload);
        assert_eq!(encoded.len(), 81);
        assert_eq!(SafetyMode::Threespace.decode(&encoded, 10), payload);
    }

    #[test]
    fn test_decode_truncated_input_yields_fewer_bytes() {
        let payload = sample_payload(16);
        for mode in [SafetyMode::Monospace, SafetyMode::Threespace] {
            let mut encoded = mode.encode(&payload);
            encoded.truncate(encoded.len() / 2);
            let decoded = mode.decode(&encoded, 16);
            assert!(decoded.len() < 16, "mode {mode:?}");
            assert_eq!(decoded[..], payload[..decoded.len()]);
        }
    }

    #[test]
    fn test_marker_roundtrip() {
        for mode in ALL_MODES {
            assert_eq!(SafetyMode::detect(mode.marker()).unwrap(), mode);
        }
    }

    #[test]
    fn test_detect_high_range_average() {
        // Average 200 sits inside the high bucket.
        assert_eq!(
            SafetyMode::detect([200, 200, 200]).unwrap(),
            SafetyMode::Threespace
        );
    }

    #[test]
    fn test_detect_unrecognized_marker() {
        // Average 60 falls between the declared ranges.
        let err = SafetyMode::detect([60, 60, 60]).unwrap_err();
        match err {
            VidbyteError::UnrecognizedSafetyMarker { r, g, b, avg } => {
                assert_eq!((r, g, b), (60, 60, 60));
                assert!((avg - 60.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_detect_tolerates_drifted_marker() {
        assert_eq!(
            SafetyMode::detect([3, 12, 7]).unwrap(),
            SafetyMode::Monospace
        );
        assert_eq!(
            SafetyMode::detect([130, 125, 133]).unwrap(),
            SafetyMode::Fullspace
        );
        assert_eq!(
            SafetyMode::detect([250, 245, 255]).unwrap(),
            SafetyMode::Threespace
        );
    }

    #[test]
    fn test_stream_decoder_matches_whole_buffer_decode() {
        for mode in ALL_MODES {
            let payload = sample_payload(233);
            let encoded = mode.encode(&payload);
            for chunk_size in [1usize, 3, 7, 24, 64, 1000] {
                let mut decoder = StreamDecoder::new(mode, payload.len() as u64);
                let mut out = Vec::new();
                for chunk in encoded.chunks(chunk_size) {
                    out.extend_from_slice(&decoder.push(chunk));
                }
                out.extend_from_slice(&decoder.finish());
                assert_eq!(out, payload, "mode {mode:?} chunk {chunk_size}");
                assert_eq!(decoder.produced(), payload.len() as u64);
            }
        }
    }

    #[test]
    fn test_stream_decoder_zero_expected() {
        let mut decoder = StreamDecoder::new(SafetyMode::Fullspace, 0);
        assert!(decoder.push(&[]).is_empty());
        assert!(decoder.finish().is_empty());
    }
}
