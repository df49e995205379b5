//! Durable storage for uploaded originals on the local filesystem.

use axum::body::Bytes;
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufWriter};
use tokio_util::io::StreamReader;
use tracing::warn;

#[derive(Debug)]
pub enum StoreError {
    /// The upload exceeded the configured byte limit.
    TooLarge(u64),
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::TooLarge(max) => {
                write!(f, "upload exceeds the {} byte limit", max)
            }
            StoreError::Io(e) => write!(f, "storage I/O error: {}", e),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::TooLarge(_) => None,
            StoreError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Writes incoming byte streams into the upload directory and removes them
/// again on delete. A failed or oversized write never leaves a partial file
/// behind.
#[derive(Clone)]
pub struct FsStorage {
    upload_dir: PathBuf,
    max_bytes: u64,
}

impl FsStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_bytes,
        }
    }

    /// Collision-resistant stored name: nanosecond timestamp plus the
    /// sanitized client-supplied file name.
    pub fn assign_name(&self, original: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        format!("{}-{}", nanos, sanitize_file_name(original))
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }

    /// Stream the upload body to `file_name`, enforcing the size cap during
    /// the copy. Returns the number of bytes written. On any failure the
    /// partial file is removed.
    pub async fn store<S, E>(&self, file_name: &str, stream: S) -> Result<u64, StoreError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let path = self.path_of(file_name);

        let result = async {
            let body_with_io_error =
                stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
            let body_reader = StreamReader::new(body_with_io_error);
            futures::pin_mut!(body_reader);

            // One byte of headroom so the cap check can tell "exactly at the
            // limit" apart from "truncated".
            let mut limited = body_reader.take(self.max_bytes + 1);
            let mut file = BufWriter::new(File::create(&path).await?);
            tokio::io::copy(&mut limited, &mut file).await
        }
        .await;

        match result {
            Ok(written) if written > self.max_bytes => {
                self.discard(file_name).await;
                Err(StoreError::TooLarge(self.max_bytes))
            }
            Ok(written) => Ok(written),
            Err(e) => {
                self.discard(file_name).await;
                Err(StoreError::Io(e))
            }
        }
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, file_name: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_of(file_name)).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    async fn discard(&self, file_name: &str) {
        if let Err(e) = self.remove(file_name).await {
            warn!("failed to discard partial upload {}: {}", file_name, e);
        }
    }
}

/// Keep only the final path component and replace whitespace runs, so the
/// stored name is filesystem-safe and free of traversal components.
pub fn sanitize_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        String::from("upload")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use tempfile::tempdir;

    type E = std::io::Error;

    #[tokio::test]
    async fn store_writes_stream_contents() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), 1024);

        let test_data = "Hello, world!";
        let mock_stream = stream::iter(vec![Ok::<Bytes, E>(Bytes::from(test_data))]);

        let written = storage.store("test_file.mp4", mock_stream).await.unwrap();
        assert_eq!(written, test_data.len() as u64);

        let contents = std::fs::read_to_string(dir.path().join("test_file.mp4")).unwrap();
        assert_eq!(contents, test_data);
    }

    #[tokio::test]
    async fn store_error_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), 1024);

        let mock_stream = stream::iter(vec![
            Ok::<Bytes, &str>(Bytes::from("partial")),
            Err("connection reset"),
        ]);

        let result = storage.store("broken.mp4", mock_stream).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!dir.path().join("broken.mp4").exists());
    }

    #[tokio::test]
    async fn store_enforces_size_cap() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), 4);

        let mock_stream = stream::iter(vec![Ok::<Bytes, E>(Bytes::from("way past the cap"))]);

        let result = storage.store("huge.mp4", mock_stream).await;
        assert!(matches!(result, Err(StoreError::TooLarge(4))));
        assert!(!dir.path().join("huge.mp4").exists());
    }

    #[tokio::test]
    async fn store_accepts_exactly_max_bytes() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), 4);

        let mock_stream = stream::iter(vec![Ok::<Bytes, E>(Bytes::from("abcd"))]);

        let written = storage.store("fits.mp4", mock_stream).await.unwrap();
        assert_eq!(written, 4);
        assert!(dir.path().join("fits.mp4").exists());
    }

    #[tokio::test]
    async fn remove_tolerates_missing_files() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(dir.path(), 1024);

        assert!(storage.remove("never-existed.mp4").await.is_ok());
    }

    #[test]
    fn sanitize_replaces_whitespace() {
        assert_eq!(sanitize_file_name("my cool video.mp4"), "my_cool_video.mp4");
    }

    #[test]
    fn sanitize_strips_directory_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("/tmp/video clip.mp4"), "video_clip.mp4");
    }

    #[test]
    fn sanitize_falls_back_on_empty_names() {
        assert_eq!(sanitize_file_name("   "), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[test]
    fn assigned_names_embed_the_sanitized_original() {
        let storage = FsStorage::new("/tmp", 1024);
        let name = storage.assign_name("my clip.mp4");
        assert!(name.ends_with("-my_clip.mp4"));

        let other = storage.assign_name("my clip.mp4");
        assert_ne!(name, other);
    }
}
