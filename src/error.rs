use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidbyteError {
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("{name} not found on PATH (set {env} to override)")]
    BinaryNotFound { name: &'static str, env: &'static str },

    #[error("failed to spawn {name}: {source}")]
    SpawnFailure {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} {status}: {stderr}")]
    SubprocessExit {
        name: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to probe video: {0}")]
    ProbeFailure(String),

    #[error("metadata header exceeded {limit} bytes without a second delimiter")]
    HeaderTooLarge { limit: usize },

    #[error("invalid file size in metadata: {0:?}")]
    InvalidSizeMetadata(String),

    #[error("unrecognized safety marker: RGB({r},{g},{b}), average={avg:.2}")]
    UnrecognizedSafetyMarker { r: u8, g: u8, b: u8, avg: f64 },

    #[error("no pixel grid dimension satisfies the layout constraints")]
    LayoutUnsatisfiable,

    #[error("failed to write output file: {0}")]
    WriterIo(#[source] std::io::Error),

    #[error("stream ended after {received} of {expected} payload bytes")]
    TruncatedPayload { received: u64, expected: u64 },
}
