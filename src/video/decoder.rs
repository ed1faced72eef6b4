use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use log::info;

use crate::error::VidbyteError;
use crate::video::encoder::{capture_stderr, join_stderr};

/// Spawns ffmpeg to unpack a video container back into the raw RGB pixel
/// stream, exposed as a pull-based byte source.
pub struct VideoDecoder<'a> {
    ffmpeg: &'a Path,
}

impl<'a> VideoDecoder<'a> {
    pub fn new(ffmpeg: &'a Path) -> Self {
        Self { ffmpeg }
    }

    pub fn open_pixel_source(&self, video_path: &Path) -> Result<PixelSource, VidbyteError> {
        info!("decoding video: {}", video_path.display());

        let mut child = Command::new(self.ffmpeg)
            .args(["-loglevel", "error", "-i"])
            .arg(video_path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VidbyteError::SpawnFailure {
                name: "ffmpeg",
                source,
            })?;

        let stderr = capture_stderr(&mut child);
        let stdout = child.stdout.take().expect("stdout was piped");
        Ok(PixelSource {
            child,
            stdout,
            stderr,
        })
    }
}

/// A running ffmpeg decode process. Reads are strictly sequential; the
/// caller processes one chunk fully before pulling the next, which is what
/// keeps pixel data from piling up ahead of the framer.
pub struct PixelSource {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
}

impl PixelSource {
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stdout.read(buf) {
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// Kill the process without waiting for it to drain its remaining
    /// frames. Used once the declared payload size has been received — the
    /// stream usually carries trailing padding frames nobody needs.
    pub fn terminate(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = join_stderr(self.stderr.take());
    }

    /// Wait for a natural exit; returns whether it succeeded plus the
    /// accumulated stderr text.
    pub fn finish(mut self) -> Result<(std::process::ExitStatus, String), VidbyteError> {
        let status = self
            .child
            .wait()
            .map_err(|source| VidbyteError::SpawnFailure {
                name: "ffmpeg",
                source,
            })?;
        let stderr = join_stderr(self.stderr.take());
        Ok((status, stderr))
    }
}
