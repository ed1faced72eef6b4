use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::VidbyteError;

/// Geometry of an existing video container, used to sanity-check a video
/// before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<u64>,
    pub fps: Option<f64>,
}

impl VideoInfo {
    /// The encoder only ever produces even square grids.
    pub fn is_even_square(&self) -> bool {
        self.width == self.height && self.width % 2 == 0
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: u32,
    height: u32,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
}

pub fn probe_video(ffprobe: &Path, video_path: &Path) -> Result<VideoInfo, VidbyteError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,nb_frames,r_frame_rate",
            "-of",
            "json",
        ])
        .arg(video_path)
        .output()
        .map_err(|source| VidbyteError::SpawnFailure {
            name: "ffprobe",
            source,
        })?;

    if !output.status.success() {
        return Err(VidbyteError::SubprocessExit {
            name: "ffprobe",
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| VidbyteError::ProbeFailure(e.to_string()))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VidbyteError::ProbeFailure("no video stream found".to_string()))?;

    Ok(VideoInfo {
        width: stream.width,
        height: stream.height,
        frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
        fps: stream.r_frame_rate.as_deref().and_then(parse_frame_rate),
    })
}

/// ffprobe reports the rate as a rational like `"30/1"`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 || !num.is_finite() || !den.is_finite() {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("30000/1001").map(|f| (f * 100.0).round()), Some(2997.0));
        assert_eq!(parse_frame_rate("30"), None);
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("x/y"), None);
    }

    #[test]
    fn test_even_square_check() {
        let square = VideoInfo {
            width: 64,
            height: 64,
            frame_count: None,
            fps: None,
        };
        assert!(square.is_even_square());

        let odd = VideoInfo {
            width: 65,
            height: 65,
            ..square.clone()
        };
        assert!(!odd.is_even_square());

        let rect = VideoInfo {
            width: 64,
            height: 48,
            ..square
        };
        assert!(!rect.is_even_square());
    }
}
