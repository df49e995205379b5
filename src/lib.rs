//! Tubelet - Video sharing service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (the video record and its lifecycle)
//! - ports/: Trait definitions (repository, thumbnailer)
//! - adapters/: Concrete implementations (JSON library, filesystem storage,
//!   ffmpeg, inbound HTTP)
//! - application/: Generic services (intake pipeline, registry)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use adapters::{FfmpegThumbnailer, FsStorage, JsonLibrary};
pub use config::Config;
