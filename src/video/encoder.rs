use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use indicatif::ProgressBar;
use log::info;

use crate::config::EncodingParams;
use crate::error::VidbyteError;
use crate::layout::Layout;

/// Streams an assembled pixel buffer into an ffmpeg process that packs it
/// into an H.265/MP4 container with the computed frame geometry.
pub struct VideoEncoder<'a> {
    ffmpeg: &'a Path,
    layout: Layout,
    params: EncodingParams,
}

impl<'a> VideoEncoder<'a> {
    pub fn new(ffmpeg: &'a Path, layout: Layout, params: EncodingParams) -> Self {
        Self {
            ffmpeg,
            layout,
            params,
        }
    }

    /// Write `stream` (already padded to a whole number of frames) to
    /// `output_path` in bounded chunks. Writes block when ffmpeg's stdin
    /// pipe is full, which is the backpressure that keeps memory flat.
    pub fn encode_stream(
        &self,
        stream: &[u8],
        output_path: &Path,
        progress: &ProgressBar,
    ) -> Result<(), VidbyteError> {
        debug_assert_eq!(stream.len() as u64, self.layout.total_video_bytes);

        info!(
            "encoding {} bytes into {} frames ({}x{} @ {} fps, x265 {}, lossless: {})",
            stream.len(),
            self.layout.frames,
            self.layout.dimension,
            self.layout.dimension,
            self.layout.fps,
            self.params.x265_params,
            self.params.lossless,
        );

        let geometry = format!("{}x{}", self.layout.dimension, self.layout.dimension);
        let mut child = Command::new(self.ffmpeg)
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s:v",
                &geometry,
                "-r",
                &self.layout.fps.to_string(),
                "-i",
                "-",
                "-an",
                "-c:v",
                "libx265",
                "-preset",
                "medium",
                "-x265-params",
                self.params.x265_params,
                "-g",
                "1",
                "-bf",
                "0",
                "-frames:v",
                &self.layout.frames.to_string(),
                "-pix_fmt",
                "gbrp",
                "-movflags",
                "+faststart",
            ])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VidbyteError::SpawnFailure {
                name: "ffmpeg",
                source,
            })?;

        let stderr_handle = capture_stderr(&mut child);
        let mut stdin = child.stdin.take().expect("stdin was piped");

        for chunk in stream.chunks(crate::config::WRITE_CHUNK_SIZE) {
            if let Err(err) = stdin.write_all(chunk) {
                // ffmpeg died mid-stream; its stderr has the real story.
                drop(stdin);
                let _ = child.kill();
                let status = child.wait().map_err(|source| VidbyteError::SpawnFailure {
                    name: "ffmpeg",
                    source,
                })?;
                let stderr = join_stderr(stderr_handle);
                return Err(VidbyteError::SubprocessExit {
                    name: "ffmpeg",
                    status,
                    stderr: if stderr.is_empty() {
                        err.to_string()
                    } else {
                        stderr
                    },
                });
            }
            progress.inc(chunk.len() as u64);
        }
        drop(stdin);

        let status = child.wait().map_err(|source| VidbyteError::SpawnFailure {
            name: "ffmpeg",
            source,
        })?;
        let stderr = join_stderr(stderr_handle);
        if !status.success() {
            return Err(VidbyteError::SubprocessExit {
                name: "ffmpeg",
                status,
                stderr,
            });
        }

        info!("video encoding complete: {}", output_path.display());
        Ok(())
    }
}

/// Drain a child's stderr on a thread so the pipe never backs up while the
/// main thread is busy streaming pixels. Surfaced only on failure.
pub(crate) fn capture_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf.trim().to_string()
    }))
}

pub(crate) fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
