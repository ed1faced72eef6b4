use std::path::{Path, PathBuf};

use anyhow::Result;

/// A hook invoked between encoding and decoding in a [`roundtrip`](super::roundtrip).
///
/// Implement this trait to inject custom logic between the two steps — for
/// example, uploading the encoded video to a streaming platform and
/// downloading it back before decoding, to measure what the platform's
/// re-encode does to each safety mode.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use anyhow::Result;
/// use vidbyte::PipelineHook;
///
/// struct UploadHook;
///
/// impl PipelineHook for UploadHook {
///     fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf> {
///         // upload encoded_path, download it back, return the local copy
///         Ok(encoded_path.to_path_buf()) // placeholder
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Called after encoding completes. `encoded_path` is the freshly
    /// written video. Return the path the decoder should read from — the
    /// same file, or a locally-downloaded copy after a remote round-trip.
    fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf>;
}

/// A no-op hook that passes the encoded path through unchanged.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn after_encode(&self, encoded_path: &Path) -> Result<PathBuf> {
        Ok(encoded_path.to_path_buf())
    }
}
