use crate::safety::SafetyMode;

// Pixel grid bounds. Dimensions are even so ffmpeg's chroma handling never
// forces a resize.
pub const MIN_DIMENSION: u32 = 16;
pub const MAX_DIMENSION: u32 = 2048;

// Frame rate bounds; the selected rate is always even.
pub const MIN_FPS: u32 = 2;
pub const MAX_FPS: u32 = 60;

pub const BYTES_PER_PIXEL: u64 = 3;

// Metadata header framing
pub const METADATA_DELIMITER: u8 = b';';
pub const MAX_METADATA_BYTES: usize = 128;
pub const DEFAULT_EXTENSION: &str = "bin";

// Safety marker: a single pixel prepended to the stream
pub const SAFETY_MARKER_SIZE: usize = 3;

// Midpoint of the 0-255 channel range; pixels at or above it decode as bit 1
pub const BINARY_THRESHOLD: u8 = 128;

// Pipe I/O granularity for both directions
pub const WRITE_CHUNK_SIZE: usize = 64 * 1024;
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Runtime configuration for an encode operation.
#[derive(Debug, Clone, Default)]
pub struct VidbyteConfig {
    pub safety: SafetyMode,
    /// Force a specific grid dimension instead of searching for the
    /// smallest-output layout. Clamped to the dimension bounds and rounded
    /// up to even.
    pub forced_dimension: Option<u32>,
}

/// x265 parameters for the outer video codec, per safety mode.
#[derive(Debug, Clone, Copy)]
pub struct EncodingParams {
    pub lossless: bool,
    pub x265_params: &'static str,
}

/// Fullspace carries raw bytes directly in pixel values and needs a
/// bit-exact transport; the bit-level modes tolerate quantization drift and
/// can use a lossy rate factor.
pub fn encoding_params(mode: SafetyMode) -> EncodingParams {
    match mode {
        SafetyMode::Fullspace => EncodingParams {
            lossless: true,
            x265_params: "lossless=1",
        },
        SafetyMode::Monospace | SafetyMode::Threespace => EncodingParams {
            lossless: false,
            x265_params: "crf=20",
        },
    }
}
