pub mod chunker;
pub mod config;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod safety;
pub mod video;

pub use config::VidbyteConfig;
pub use error::VidbyteError;
pub use pipeline::decode::decode_file;
pub use pipeline::encode::encode_file;
pub use pipeline::hook::{NoopHook, PipelineHook};
pub use pipeline::{roundtrip, RoundtripResult};
pub use safety::SafetyMode;
