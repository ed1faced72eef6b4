use crate::config;
use crate::error::VidbyteError;

/// The self-delimiting text prefix identifying the original file inside the
/// pixel byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Sanitized extension token: lowercase ASCII alphanumerics, `_`, `-`.
    pub extension: String,
    /// Exact byte count of the original file, before safety encoding.
    pub file_size: u64,
}

/// Reduce an extension to its sanitized token. Anything outside
/// `[A-Za-z0-9_-]` is dropped, the rest lowercased; an empty result becomes
/// the default placeholder.
pub fn sanitize_extension(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        config::DEFAULT_EXTENSION.to_string()
    } else {
        cleaned
    }
}

/// Serialize a header as `"<ext>;<size>;"`. The second semicolon, not a
/// fixed length, is what terminates the header on the wire.
pub fn serialize(meta: &FileMetadata) -> Vec<u8> {
    format!("{};{};", meta.extension, meta.file_size).into_bytes()
}

/// Outcome of feeding a chunk to the [`HeaderScanner`].
#[derive(Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// All bytes were consumed and the header is still incomplete.
    Incomplete,
    /// The second delimiter was seen. `consumed` counts the chunk bytes that
    /// belonged to the header (delimiter included); everything after them is
    /// payload and was not touched.
    Complete {
        metadata: FileMetadata,
        consumed: usize,
    },
}

/// Incremental parser for the metadata header.
///
/// Accumulates bytes into a bounded buffer, counting delimiters, and
/// completes the instant the second one is seen — regardless of how the
/// stream is chunked, down to one byte at a time.
#[derive(Debug, Default)]
pub struct HeaderScanner {
    buf: Vec<u8>,
    delimiters: u8,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<ScanOutcome, VidbyteError> {
        for (i, &byte) in chunk.iter().enumerate() {
            if self.buf.len() >= config::MAX_METADATA_BYTES {
                return Err(VidbyteError::HeaderTooLarge {
                    limit: config::MAX_METADATA_BYTES,
                });
            }
            self.buf.push(byte);
            if byte == config::METADATA_DELIMITER {
                self.delimiters += 1;
                if self.delimiters == 2 {
                    let metadata = parse_header(&self.buf)?;
                    return Ok(ScanOutcome::Complete {
                        metadata,
                        consumed: i + 1,
                    });
                }
            }
        }
        Ok(ScanOutcome::Incomplete)
    }
}

fn parse_header(bytes: &[u8]) -> Result<FileMetadata, VidbyteError> {
    let text = String::from_utf8_lossy(bytes);
    let mut parts = text.split(';');
    let extension = sanitize_extension(parts.next().unwrap_or(""));
    let size_text = parts.next().unwrap_or("");
    let file_size = size_text
        .parse::<u64>()
        .map_err(|_| VidbyteError::InvalidSizeMetadata(size_text.to_string()))?;
    Ok(FileMetadata {
        extension,
        file_size,
    })
}
