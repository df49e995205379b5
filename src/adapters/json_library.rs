//! Whole-file JSON persistence for the video metadata collection.
//!
//! The entire collection is rewritten on every mutation. There is no journal:
//! a crash between a mutation and its save loses that mutation only. A
//! malformed backing file degrades to an empty collection instead of refusing
//! to start.

use crate::domain::video::{NewVideo, ProcessingState, VideoRecord};
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug)]
pub enum LibraryError {
    Io(io::Error),
    Serialization(serde_json::Error),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Io(e) => write!(f, "library I/O error: {}", e),
            LibraryError::Serialization(e) => write!(f, "library serialization error: {}", e),
        }
    }
}

impl Error for LibraryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LibraryError::Io(e) => Some(e),
            LibraryError::Serialization(e) => Some(e),
        }
    }
}

impl From<io::Error> for LibraryError {
    fn from(err: io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Serialization(err)
    }
}

/// JSON-file backed [`VideoRepository`].
///
/// The mutex guards both the in-memory collection and the backing file
/// rewrite, so a mutation and its persist form one critical section.
pub struct JsonLibrary {
    path: PathBuf,
    videos: Mutex<Vec<VideoRecord>>,
}

impl JsonLibrary {
    /// Load the backing file, creating it empty when absent. Malformed
    /// content is logged and replaced by an empty in-memory collection;
    /// the file itself is left untouched until the next save.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let path = path.into();

        let videos = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<Vec<VideoRecord>>(&raw) {
                Ok(videos) => videos,
                Err(e) => {
                    warn!(
                        "library file {:?} is malformed ({}), starting with an empty collection",
                        path, e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
                let library = Self {
                    path,
                    videos: Mutex::new(Vec::new()),
                };
                library.persist(&[]).await?;
                return Ok(library);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            videos: Mutex::new(videos),
        })
    }

    /// Rewrite the whole collection. Writes a sibling temp file first and
    /// renames it over the target, so readers never observe a torn file.
    async fn persist(&self, videos: &[VideoRecord]) -> Result<(), LibraryError> {
        let json = serde_json::to_vec_pretty(videos)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for JsonLibrary {
    async fn all(&self) -> Result<Vec<VideoRecord>, Box<dyn Error + Send + Sync>> {
        let videos = self.videos.lock().await;
        // Newest first: the homepage contract, not an implementation detail.
        Ok(videos.iter().rev().cloned().collect())
    }

    async fn find(&self, id: u64) -> Result<Option<VideoRecord>, Box<dyn Error + Send + Sync>> {
        let videos = self.videos.lock().await;
        Ok(videos.iter().find(|v| v.id == id).cloned())
    }

    async fn append(&self, draft: NewVideo) -> Result<VideoRecord, Box<dyn Error + Send + Sync>> {
        let mut videos = self.videos.lock().await;
        // max + 1 so ids survive out-of-order deletions without reuse.
        let id = videos.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        let record = VideoRecord {
            id,
            owner_key: draft.owner_key,
            title: draft.title,
            file_name: draft.file_name,
            path: draft.path,
            thumbnail_path: draft.thumbnail_path,
            upload_date: draft.upload_date,
            processing_state: draft.processing_state,
        };
        videos.push(record.clone());
        // On persist failure the in-memory state stays authoritative until
        // the next successful save.
        self.persist(&videos).await?;
        Ok(record)
    }

    async fn set_thumbnail(
        &self,
        id: u64,
        thumbnail_path: &str,
        state: ProcessingState,
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let mut videos = self.videos.lock().await;
        let Some(record) = videos.iter_mut().find(|v| v.id == id) else {
            return Ok(false);
        };
        record.thumbnail_path = thumbnail_path.to_string();
        record.processing_state = state;
        self.persist(&videos).await?;
        Ok(true)
    }

    async fn remove(
        &self,
        id: u64,
    ) -> Result<Option<VideoRecord>, Box<dyn Error + Send + Sync>> {
        let mut videos = self.videos.lock().await;
        let Some(index) = videos.iter().position(|v| v.id == id) else {
            return Ok(None);
        };
        let removed = videos.remove(index);
        self.persist(&videos).await?;
        Ok(Some(removed))
    }
}
