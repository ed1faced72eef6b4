pub mod decoder;
pub mod encoder;
pub mod ffmpeg;
pub mod probe;
