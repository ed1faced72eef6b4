use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::config;
use crate::error::VidbyteError;
use crate::metadata::{FileMetadata, HeaderScanner, ScanOutcome, sanitize_extension};
use crate::safety::{SafetyMode, StreamDecoder};
use crate::video::decoder::VideoDecoder;
use crate::video::ffmpeg::FfmpegPaths;
use crate::video::probe;

/// Where the recovered file goes. The extension is only known once the
/// header has been parsed, so derivation is deferred until then.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    Explicit(PathBuf),
    /// Derive from the input video path: same directory and stem, extension
    /// taken from the metadata header.
    DeriveFrom(PathBuf),
}

impl OutputTarget {
    fn resolve(&self, extension: &str) -> PathBuf {
        match self {
            OutputTarget::Explicit(path) if path.extension().is_some() => path.clone(),
            OutputTarget::Explicit(path) => path.with_extension(extension),
            OutputTarget::DeriveFrom(video) => video.with_extension(extension),
        }
    }

    fn provided_extension(&self) -> Option<String> {
        match self {
            OutputTarget::Explicit(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(sanitize_extension),
            OutputTarget::DeriveFrom(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpState {
    AwaitingMarker,
    AwaitingHeader,
    StreamingPayload,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// The chunk was fully consumed; feed the next one.
    NeedMore,
    /// The declared payload size has been received. Stop reading — anything
    /// still buffered upstream is padding.
    Complete,
}

/// What a completed decode produced.
#[derive(Debug)]
pub struct DecodeSummary {
    pub path: PathBuf,
    pub metadata: FileMetadata,
    pub received: u64,
}

/// Decode-direction stream pump: a state machine fed raw pixel bytes chunk
/// by chunk. Routes bytes to the header scanner until the second delimiter,
/// then safety-decodes the remainder into the output file, stopping the
/// instant the declared size is reached. Owns the output file handle for
/// the whole operation; it is closed on every exit path.
pub struct DecodePump {
    state: PumpState,
    target: OutputTarget,
    marker: Vec<u8>,
    scanner: HeaderScanner,
    mode: Option<SafetyMode>,
    decoder: Option<StreamDecoder>,
    writer: Option<BufWriter<File>>,
    resolved_path: Option<PathBuf>,
    metadata: Option<FileMetadata>,
    /// Safety-encoded payload bytes still expected from the stream; bytes
    /// past this count are frame padding.
    encoded_remaining: u64,
    received: u64,
}

impl DecodePump {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            state: PumpState::AwaitingMarker,
            target,
            marker: Vec::with_capacity(config::SAFETY_MARKER_SIZE),
            scanner: HeaderScanner::new(),
            mode: None,
            decoder: None,
            writer: None,
            resolved_path: None,
            metadata: None,
            encoded_remaining: 0,
            received: 0,
        }
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Feed one chunk. Errors are fatal: the pump is unusable afterwards
    /// and the caller must tear down the pixel source.
    pub fn push(&mut self, chunk: &[u8]) -> Result<PumpStatus, VidbyteError> {
        let mut rest = chunk;
        loop {
            match self.state {
                PumpState::AwaitingMarker => {
                    let need = config::SAFETY_MARKER_SIZE - self.marker.len();
                    let take = need.min(rest.len());
                    self.marker.extend_from_slice(&rest[..take]);
                    rest = &rest[take..];
                    if self.marker.len() < config::SAFETY_MARKER_SIZE {
                        return Ok(PumpStatus::NeedMore);
                    }
                    let pixel = [self.marker[0], self.marker[1], self.marker[2]];
                    let mode = SafetyMode::detect(pixel)?;
                    info!("detected safety mode: {mode:?}");
                    self.mode = Some(mode);
                    self.state = PumpState::AwaitingHeader;
                }
                PumpState::AwaitingHeader => match self.scanner.push(rest)? {
                    ScanOutcome::Incomplete => return Ok(PumpStatus::NeedMore),
                    ScanOutcome::Complete { metadata, consumed } => {
                        rest = &rest[consumed..];
                        self.begin_payload(metadata)?;
                        if self.state == PumpState::Done {
                            return Ok(PumpStatus::Complete);
                        }
                    }
                },
                PumpState::StreamingPayload => {
                    if rest.is_empty() {
                        return Ok(PumpStatus::NeedMore);
                    }
                    let take = self.encoded_remaining.min(rest.len() as u64) as usize;
                    let decoder = self.decoder.as_mut().expect("decoder set before payload");
                    let decoded = decoder.push(&rest[..take]);
                    self.encoded_remaining -= take as u64;
                    rest = &rest[take..];
                    self.write_payload(&decoded)?;

                    let expected = self.expected_size();
                    if self.received >= expected {
                        self.complete()?;
                        return Ok(PumpStatus::Complete);
                    }
                    if self.encoded_remaining == 0 {
                        // All encoded payload bytes are in; decode the
                        // trailing partial atom before judging completion.
                        let decoder = self.decoder.as_mut().expect("decoder set before payload");
                        let tail = decoder.finish();
                        self.write_payload(&tail)?;
                        if self.received >= expected {
                            self.complete()?;
                            return Ok(PumpStatus::Complete);
                        }
                        return Err(VidbyteError::TruncatedPayload {
                            received: self.received,
                            expected,
                        });
                    }
                }
                PumpState::Done => return Ok(PumpStatus::Complete),
            }
        }
    }

    /// Consume the pump at end of stream. Succeeds only if the declared
    /// payload was fully received.
    pub fn finish(self) -> Result<DecodeSummary, VidbyteError> {
        if self.state != PumpState::Done {
            return Err(VidbyteError::TruncatedPayload {
                received: self.received,
                expected: self.metadata.as_ref().map_or(0, |m| m.file_size),
            });
        }
        let metadata = self.metadata.expect("metadata set before Done");
        let path = self.resolved_path.expect("path resolved before Done");
        Ok(DecodeSummary {
            path,
            metadata,
            received: self.received,
        })
    }

    fn expected_size(&self) -> u64 {
        self.metadata.as_ref().map_or(0, |m| m.file_size)
    }

    fn begin_payload(&mut self, metadata: FileMetadata) -> Result<(), VidbyteError> {
        let path = self.target.resolve(&metadata.extension);
        if let Some(provided) = self.target.provided_extension() {
            if provided != metadata.extension {
                warn!(
                    "output extension (.{provided}) differs from metadata (.{})",
                    metadata.extension
                );
            }
        }
        if matches!(self.target, OutputTarget::DeriveFrom(_)) && path.exists() {
            warn!("output file exists and will be overwritten: {}", path.display());
        }

        let file = File::create(&path).map_err(VidbyteError::WriterIo)?;
        self.writer = Some(BufWriter::new(file));

        let mode = self.mode.expect("mode detected before header");
        self.decoder = Some(StreamDecoder::new(mode, metadata.file_size));
        self.encoded_remaining = mode.encoded_size(metadata.file_size);

        info!(
            "extracting {} bytes to {} ({} encoded bytes expected)",
            metadata.file_size,
            path.display(),
            self.encoded_remaining
        );

        self.resolved_path = Some(path);
        self.metadata = Some(metadata);

        if self.expected_size() == 0 {
            self.complete()?;
        } else {
            self.state = PumpState::StreamingPayload;
        }
        Ok(())
    }

    fn write_payload(&mut self, decoded: &[u8]) -> Result<(), VidbyteError> {
        if decoded.is_empty() {
            return Ok(());
        }
        let writer = self.writer.as_mut().expect("writer open while streaming");
        writer.write_all(decoded).map_err(VidbyteError::WriterIo)?;
        self.received += decoded.len() as u64;
        Ok(())
    }

    /// Flush and close the output file, then mark the pump done. Closing
    /// must happen before completion is reported so termination of the
    /// pixel source can never race an in-flight write.
    fn complete(&mut self) -> Result<(), VidbyteError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(VidbyteError::WriterIo)?;
        }
        self.state = PumpState::Done;
        Ok(())
    }
}

/// Full decode pipeline: probe -> ffmpeg pixel stream -> pump -> output
/// file. Returns the path of the recovered file.
pub fn decode_file(
    video_path: &Path,
    output_path: Option<&Path>,
    paths: &FfmpegPaths,
) -> Result<PathBuf> {
    if !video_path.is_file() {
        return Err(VidbyteError::InputNotFound(video_path.to_path_buf()).into());
    }

    let video_info = probe::probe_video(&paths.ffprobe, video_path)?;
    info!(
        "input video: {} ({}x{}, {} frames, fps {})",
        video_path.display(),
        video_info.width,
        video_info.height,
        video_info
            .frame_count
            .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        video_info
            .fps
            .map_or_else(|| "unknown".to_string(), |f| format!("{f:.2}")),
    );
    if !video_info.is_even_square() {
        warn!("video is not an even square; extraction may differ from expectations");
    }

    let target = match output_path {
        Some(path) => OutputTarget::Explicit(path.to_path_buf()),
        None => OutputTarget::DeriveFrom(video_path.to_path_buf()),
    };
    let mut pump = DecodePump::new(target);

    let mut source = VideoDecoder::new(&paths.ffmpeg).open_pixel_source(video_path)?;
    let mut buf = vec![0u8; config::READ_CHUNK_SIZE];
    let mut progress: Option<ProgressBar> = None;

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                source.terminate();
                return Err(err).context("failed to read pixel stream from ffmpeg");
            }
        };

        match pump.push(&buf[..n]) {
            Ok(PumpStatus::NeedMore) => {
                if progress.is_none() {
                    if let Some(meta) = pump.metadata() {
                        progress = Some(payload_progress(meta.file_size));
                    }
                }
                if let Some(bar) = &progress {
                    bar.set_position(pump.received());
                }
            }
            Ok(PumpStatus::Complete) => {
                if let Some(bar) = progress.take() {
                    bar.finish_and_clear();
                }
                // The stream usually has padding frames left; drop them.
                source.terminate();
                let summary = pump.finish()?;
                info!("file extracted: {}", summary.path.display());
                return Ok(summary.path);
            }
            Err(err) => {
                if let Some(bar) = progress.take() {
                    bar.finish_and_clear();
                }
                source.terminate();
                return Err(err.into());
            }
        }
    }

    // The source closed before the pump completed.
    if let Some(bar) = progress.take() {
        bar.finish_and_clear();
    }
    let (status, stderr) = source.finish()?;
    if !status.success() {
        return Err(VidbyteError::SubprocessExit {
            name: "ffmpeg",
            status,
            stderr,
        }
        .into());
    }
    let summary = pump.finish()?;
    Ok(summary.path)
}

fn payload_progress(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.green/black} {bytes}/{total_bytes} ({eta})")
            .expect("static template")
            .progress_chars("##-"),
    );
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::assemble_stream;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("vidbyte_test_pump").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 131 % 256) as u8).collect()
    }

    fn padded_stream(payload: &[u8], ext: &str, mode: SafetyMode, padding: usize) -> Vec<u8> {
        let meta = FileMetadata {
            extension: ext.into(),
            file_size: payload.len() as u64,
        };
        let mut stream = assemble_stream(&meta, payload, mode);
        stream.resize(stream.len() + padding, 0);
        stream
    }

    #[test]
    fn test_pump_roundtrip_all_modes_and_chunkings() {
        let dir = temp_dir("roundtrip");
        let payload = sample_payload(997);
        for mode in [
            SafetyMode::Fullspace,
            SafetyMode::Monospace,
            SafetyMode::Threespace,
        ] {
            let stream = padded_stream(&payload, "dat", mode, 512);
            for chunk_size in [1usize, 13, 4096, usize::MAX] {
                let out = dir.join(format!("out_{mode:?}_{chunk_size}.dat"));
                let mut pump = DecodePump::new(OutputTarget::Explicit(out.clone()));
                let mut status = PumpStatus::NeedMore;
                for chunk in stream.chunks(chunk_size.min(stream.len())) {
                    status = pump.push(chunk).unwrap();
                    if status == PumpStatus::Complete {
                        break;
                    }
                }
                assert_eq!(status, PumpStatus::Complete, "mode {mode:?}");
                let summary = pump.finish().unwrap();
                assert_eq!(summary.received, payload.len() as u64);
                assert_eq!(summary.metadata.extension, "dat");
                assert_eq!(std::fs::read(&out).unwrap(), payload);
            }
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pump_completes_before_consuming_padding() {
        let dir = temp_dir("padding");
        let payload = sample_payload(64);
        let stream = padded_stream(&payload, "bin", SafetyMode::Fullspace, 10_000);
        let out = dir.join("out.bin");
        let mut pump = DecodePump::new(OutputTarget::Explicit(out.clone()));
        // One push holding payload and padding together: must report
        // completion without writing any padding.
        assert_eq!(pump.push(&stream).unwrap(), PumpStatus::Complete);
        assert_eq!(std::fs::read(&out).unwrap(), payload);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pump_zero_byte_payload() {
        let dir = temp_dir("empty");
        let stream = padded_stream(&[], "txt", SafetyMode::Fullspace, 768);
        let out = dir.join("out.txt");
        let mut pump = DecodePump::new(OutputTarget::Explicit(out.clone()));
        assert_eq!(pump.push(&stream).unwrap(), PumpStatus::Complete);
        let summary = pump.finish().unwrap();
        assert_eq!(summary.received, 0);
        assert_eq!(std::fs::read(&out).unwrap(), Vec::<u8>::new());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pump_derives_output_from_video_path() {
        let dir = temp_dir("derive");
        let video = dir.join("stash.mp4");
        let payload = sample_payload(10);
        let stream = padded_stream(&payload, "txt", SafetyMode::Fullspace, 0);
        let mut pump = DecodePump::new(OutputTarget::DeriveFrom(video.clone()));
        assert_eq!(pump.push(&stream).unwrap(), PumpStatus::Complete);
        let summary = pump.finish().unwrap();
        assert_eq!(summary.path, dir.join("stash.txt"));
        assert_eq!(std::fs::read(summary.path).unwrap(), payload);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pump_truncated_stream_fails() {
        let dir = temp_dir("truncated");
        let payload = sample_payload(100);
        let mut stream = padded_stream(&payload, "bin", SafetyMode::Monospace, 0);
        stream.truncate(stream.len() / 2);
        let out = dir.join("out.bin");
        let mut pump = DecodePump::new(OutputTarget::Explicit(out));
        assert_eq!(pump.push(&stream).unwrap(), PumpStatus::NeedMore);
        let err = pump.finish().unwrap_err();
        assert!(matches!(
            err,
            VidbyteError::TruncatedPayload { expected: 100, .. }
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pump_rejects_unknown_marker() {
        let mut pump = DecodePump::new(OutputTarget::Explicit(PathBuf::from("/dev/null")));
        let err = pump.push(&[60, 60, 60, b'x']).unwrap_err();
        assert!(matches!(err, VidbyteError::UnrecognizedSafetyMarker { .. }));
    }

    #[test]
    fn test_pump_rejects_bad_size_field() {
        let mut pump = DecodePump::new(OutputTarget::Explicit(PathBuf::from("/dev/null")));
        let mut stream = vec![128, 128, 128];
        stream.extend_from_slice(b"txt;abc;");
        let err = pump.push(&stream).unwrap_err();
        assert!(matches!(err, VidbyteError::InvalidSizeMetadata(_)));
    }

    #[test]
    fn test_output_target_resolution() {
        let explicit = OutputTarget::Explicit(PathBuf::from("/out/file.log"));
        assert_eq!(explicit.resolve("txt"), PathBuf::from("/out/file.log"));
        assert_eq!(explicit.provided_extension().as_deref(), Some("log"));

        let bare = OutputTarget::Explicit(PathBuf::from("/out/file"));
        assert_eq!(bare.resolve("txt"), PathBuf::from("/out/file.txt"));

        let derived = OutputTarget::DeriveFrom(PathBuf::from("/vids/clip.mp4"));
        assert_eq!(derived.resolve("tar"), PathBuf::from("/vids/clip.tar"));
        assert_eq!(derived.provided_extension(), None);
    }
}
