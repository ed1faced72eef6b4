use crate::config;
use crate::error::VidbyteError;

/// Computed pixel-grid geometry for a payload of known size.
///
/// Immutable once produced: one `Layout` is computed per encode call and
/// describes exactly how the byte stream tiles into whole video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Grid width and height in pixels; always even and within bounds.
    pub dimension: u32,
    /// Bytes per frame: `dimension * dimension * 3`.
    pub frame_size: u64,
    /// Number of frames; at least 1 even for an empty payload.
    pub frames: u64,
    /// Zero filler bytes appended to exactly fill the last frame.
    pub padding: u64,
    /// `frames * frame_size`; never less than the payload size.
    pub total_video_bytes: u64,
    /// Even frame rate within `[MIN_FPS, MAX_FPS]`.
    pub fps: u32,
}

fn clamp_even(value: u32, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(min, max);
    if clamped % 2 == 0 {
        clamped
    } else {
        clamped + 1
    }
}

/// Derive the frame rate from the frame count: one extra fps for every ten
/// frames, clamped and rounded up to even so very short payloads still play
/// and very long ones stay under the ceiling.
pub fn select_fps(frames: u64) -> u32 {
    let raw = frames.div_ceil(10).min(u64::from(config::MAX_FPS)) as u32;
    clamp_even(raw, config::MIN_FPS, config::MAX_FPS)
}

fn build_layout(dimension: u32, total_bytes: u64) -> Layout {
    let frame_size = u64::from(dimension) * u64::from(dimension) * config::BYTES_PER_PIXEL;
    let frames = total_bytes.div_ceil(frame_size).max(1);
    let total_video_bytes = frames * frame_size;
    Layout {
        dimension,
        frame_size,
        frames,
        padding: total_video_bytes - total_bytes,
        total_video_bytes,
        fps: 0,
    }
}

/// Pick the grid geometry for `total_bytes` of stream data.
///
/// With a forced dimension the layout is built for that single candidate
/// (clamped to bounds, rounded up to even). Otherwise every even dimension
/// in `[MIN_DIMENSION, MAX_DIMENSION]` is considered and the one minimizing
/// total video bytes wins; ties fall to smaller padding, then to the smaller
/// dimension. The tie-break is externally observable (it fixes the output
/// geometry) and must not change between releases.
pub fn compute_layout(
    total_bytes: u64,
    forced_dimension: Option<u32>,
) -> Result<Layout, VidbyteError> {
    if let Some(forced) = forced_dimension {
        let dim = clamp_even(forced, config::MIN_DIMENSION, config::MAX_DIMENSION);
        let mut layout = build_layout(dim, total_bytes);
        layout.fps = select_fps(layout.frames);
        return Ok(layout);
    }

    let mut best: Option<Layout> = None;
    let mut dim = config::MIN_DIMENSION;
    while dim <= config::MAX_DIMENSION {
        let candidate = build_layout(dim, total_bytes);
        let better = match &best {
            None => true,
            Some(b) => {
                candidate.total_video_bytes < b.total_video_bytes
                    || (candidate.total_video_bytes == b.total_video_bytes
                        && candidate.padding < b.padding)
            }
        };
        if better {
            best = Some(candidate);
        }
        dim += 2;
    }

    let mut layout = best.ok_or(VidbyteError::LayoutUnsatisfiable)?;
    layout.fps = select_fps(layout.frames);
    Ok(layout)
}
