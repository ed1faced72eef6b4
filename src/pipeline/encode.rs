use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::chunker;
use crate::config::{self, VidbyteConfig};
use crate::error::VidbyteError;
use crate::layout;
use crate::metadata::{self, FileMetadata};
use crate::safety::SafetyMode;
use crate::video::encoder::VideoEncoder;
use crate::video::ffmpeg::FfmpegPaths;

/// Assemble the pixel stream prefix in wire order: safety marker, metadata
/// header, safety-encoded payload. Padding is appended separately once the
/// layout is known.
pub fn assemble_stream(meta: &FileMetadata, payload: &[u8], mode: SafetyMode) -> Vec<u8> {
    let header = metadata::serialize(meta);
    let encoded = mode.encode(payload);
    let mut stream =
        Vec::with_capacity(config::SAFETY_MARKER_SIZE + header.len() + encoded.len());
    stream.extend_from_slice(&mode.marker());
    stream.extend_from_slice(&header);
    stream.extend_from_slice(&encoded);
    stream
}

/// Default the video path to `<input stem>.mp4`; an explicit path without an
/// extension gets one appended.
pub fn resolve_video_path(input_path: &Path, provided: Option<&Path>) -> PathBuf {
    match provided {
        Some(path) if path.extension().is_some() => path.to_path_buf(),
        Some(path) => path.with_extension("mp4"),
        None => input_path.with_extension("mp4"),
    }
}

/// Full encode pipeline: file -> header framing -> safety encoding ->
/// layout -> padded pixel stream -> ffmpeg. Returns the video path written.
pub fn encode_file(
    input_path: &Path,
    output_path: Option<&Path>,
    cfg: &VidbyteConfig,
    paths: &FfmpegPaths,
) -> Result<PathBuf> {
    let file_size = match std::fs::metadata(input_path) {
        Ok(m) if m.is_file() => m.len(),
        _ => return Err(VidbyteError::InputNotFound(input_path.to_path_buf()).into()),
    };

    let target = resolve_video_path(input_path, output_path);
    if target.exists() {
        warn!("output path exists and will be overwritten: {}", target.display());
    }

    let extension = metadata::sanitize_extension(
        input_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(""),
    );
    let meta = FileMetadata {
        extension,
        file_size,
    };

    info!("input file: {} ({} bytes)", input_path.display(), file_size);
    info!("output video: {}", target.display());

    let payload = chunker::read_file_ordered(input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;

    let mut stream = assemble_stream(&meta, &payload, cfg.safety);
    drop(payload);

    let layout = layout::compute_layout(stream.len() as u64, cfg.forced_dimension)?;
    info!(
        "layout: {}x{}, {} frames @ {} fps, {} padding bytes",
        layout.dimension, layout.dimension, layout.frames, layout.fps, layout.padding
    );

    // Trailing zeros fill the last frame exactly.
    stream.resize(layout.total_video_bytes as usize, 0);

    let progress = ProgressBar::new(stream.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            .expect("static template")
            .progress_chars("##-"),
    );

    let encoder = VideoEncoder::new(&paths.ffmpeg, layout, config::encoding_params(cfg.safety));
    let result = encoder.encode_stream(&stream, &target, &progress);
    progress.finish_and_clear();
    result?;

    info!("encode complete: {}", target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_stream_wire_order() {
        let meta = FileMetadata {
            extension: "txt".into(),
            file_size: 4,
        };
        let stream = assemble_stream(&meta, b"data", SafetyMode::Fullspace);
        assert_eq!(&stream[..3], &[128, 128, 128]);
        assert_eq!(&stream[3..9], b"txt;4;");
        assert_eq!(&stream[9..], b"data");
    }

    #[test]
    fn test_assemble_stream_encodes_payload_only() {
        let meta = FileMetadata {
            extension: "bin".into(),
            file_size: 2,
        };
        let stream = assemble_stream(&meta, &[0xFF, 0x00], SafetyMode::Monospace);
        // Marker + plain-text header + 48 bytes of bit-expanded payload.
        assert_eq!(&stream[..3], &[0, 0, 0]);
        assert_eq!(&stream[3..9], b"bin;2;");
        assert_eq!(stream.len(), 9 + 48);
    }

    #[test]
    fn test_resolve_video_path() {
        let input = Path::new("/data/archive.tar");
        assert_eq!(
            resolve_video_path(input, None),
            PathBuf::from("/data/archive.mp4")
        );
        assert_eq!(
            resolve_video_path(input, Some(Path::new("/out/clip.mkv"))),
            PathBuf::from("/out/clip.mkv")
        );
        assert_eq!(
            resolve_video_path(input, Some(Path::new("/out/clip"))),
            PathBuf::from("/out/clip.mp4")
        );
    }
}
