//! Adapters - Concrete implementations of ports, plus the inbound HTTP layer.

pub mod ffmpeg;
pub mod fs;
pub mod http;
pub mod json_library;

pub use ffmpeg::FfmpegThumbnailer;
pub use fs::FsStorage;
pub use json_library::JsonLibrary;
