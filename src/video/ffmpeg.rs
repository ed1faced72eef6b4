use std::env;
use std::path::PathBuf;

use crate::error::VidbyteError;

const FFMPEG_ENV: &str = "VIDBYTE_FFMPEG";
const FFPROBE_ENV: &str = "VIDBYTE_FFPROBE";

/// Locations of the ffmpeg and ffprobe binaries, resolved once at startup
/// and passed into the pipeline explicitly. A missing binary is a
/// construction-time error, not something discovered mid-stream.
#[derive(Debug, Clone)]
pub struct FfmpegPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FfmpegPaths {
    pub fn resolve() -> Result<Self, VidbyteError> {
        Ok(Self {
            ffmpeg: find_binary("ffmpeg", FFMPEG_ENV)?,
            ffprobe: find_binary("ffprobe", FFPROBE_ENV)?,
        })
    }
}

fn find_binary(name: &'static str, env_var: &'static str) -> Result<PathBuf, VidbyteError> {
    if let Some(overridden) = env::var_os(env_var) {
        let path = PathBuf::from(overridden);
        if path.is_file() {
            return Ok(path);
        }
        return Err(VidbyteError::BinaryNotFound {
            name,
            env: env_var,
        });
    }

    for dir in env::split_paths(&env::var_os("PATH").unwrap_or_default()) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(VidbyteError::BinaryNotFound {
        name,
        env: env_var,
    })
}
