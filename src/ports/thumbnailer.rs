use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Seam around the external frame-extraction tool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    /// Duration of the media in seconds. 0.0 when the probe cannot tell.
    async fn media_duration(&self, media: &Path) -> io::Result<f64>;

    /// Extract a single frame at `at_seconds` into `output`, scaled to the
    /// configured thumbnail resolution.
    async fn extract_frame(&self, media: &Path, at_seconds: f64, output: &Path) -> io::Result<()>;
}
