//! Environment configuration.

use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Directory for stored originals
    pub upload_dir: PathBuf,
    /// Directory for generated thumbnails
    pub thumbnail_dir: PathBuf,
    /// Directory for the static frontend
    pub public_dir: PathBuf,
    /// Backing file for the video metadata collection
    pub library_path: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
    /// When set, every request must carry an owner key and lists are
    /// filtered per owner
    pub owner_required: bool,
    /// Upper bound on a single ffmpeg/ffprobe invocation, in seconds
    pub thumbnail_timeout_secs: u64,
    /// Thumbnail width in pixels (height follows the aspect ratio)
    pub thumbnail_width: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| String::from("./uploads"))
                .into(),
            thumbnail_dir: env::var("THUMBNAIL_DIR")
                .unwrap_or_else(|_| String::from("./thumbnails"))
                .into(),
            public_dir: env::var("PUBLIC_DIR")
                .unwrap_or_else(|_| String::from("./public"))
                .into(),
            library_path: env::var("LIBRARY_PATH")
                .unwrap_or_else(|_| String::from("./videos.json"))
                .into(),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(512 * 1024 * 1024),
            owner_required: env::var("OWNER_REQUIRED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            thumbnail_timeout_secs: env::var("THUMBNAIL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            thumbnail_width: env::var("THUMBNAIL_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(480),
        }
    }
}
