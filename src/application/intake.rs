//! Media intake pipeline: store the upload, register the record, derive the
//! thumbnail in the background.
//!
//! The pipeline is asynchronous: the record is created in the `pending` state
//! with a placeholder thumbnail and the client is answered immediately. A
//! detached task probes the media, extracts one frame at the temporal
//! midpoint and flips the state to `ready` or `failed`. The completion path
//! re-fetches the record by id, so a video deleted while its thumbnail was
//! still rendering is tolerated.

use crate::adapters::fs::{FsStorage, StoreError};
use crate::domain::video::{
    NewVideo, ProcessingState, VideoRecord, DEFAULT_TITLE, FAILED_THUMBNAIL, PENDING_THUMBNAIL,
};
use crate::ports::repository::VideoRepository;
use crate::ports::thumbnailer::Thumbnailer;
use axum::body::Bytes;
use axum::BoxError;
use chrono::Utc;
use futures::Stream;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug)]
pub enum IngestError {
    /// No file field, or a file field that carried zero bytes.
    EmptyUpload,
    TooLarge(u64),
    Storage(io::Error),
    Library(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::EmptyUpload => write!(f, "no video file was received"),
            IngestError::TooLarge(max) => {
                write!(f, "upload exceeds the {} byte limit", max)
            }
            IngestError::Storage(e) => write!(f, "failed to store upload: {}", e),
            IngestError::Library(e) => write!(f, "failed to record upload: {}", e),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IngestError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TooLarge(max) => IngestError::TooLarge(max),
            StoreError::Io(e) => IngestError::Storage(e),
        }
    }
}

/// An upload that has been durably written but not yet registered.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub bytes: u64,
}

pub struct IntakeService<R, T> {
    repo: Arc<R>,
    storage: FsStorage,
    thumbnailer: Arc<T>,
    thumbnail_dir: PathBuf,
}

impl<R, T> Clone for IntakeService<R, T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            storage: self.storage.clone(),
            thumbnailer: self.thumbnailer.clone(),
            thumbnail_dir: self.thumbnail_dir.clone(),
        }
    }
}

impl<R, T> IntakeService<R, T>
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    pub fn new(
        repo: Arc<R>,
        storage: FsStorage,
        thumbnailer: Arc<T>,
        thumbnail_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            storage,
            thumbnailer,
            thumbnail_dir: thumbnail_dir.into(),
        }
    }

    /// Stream the upload body to durable storage under a fresh name. A
    /// zero-byte body is rejected and the empty file removed.
    pub async fn receive<S, E>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredUpload, IngestError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let file_name = self.storage.assign_name(original_name);
        let bytes = self.storage.store(&file_name, stream).await?;
        if bytes == 0 {
            if let Err(e) = self.storage.remove(&file_name).await {
                warn!("failed to remove empty upload {}: {}", file_name, e);
            }
            return Err(IngestError::EmptyUpload);
        }
        Ok(StoredUpload { file_name, bytes })
    }

    /// Register a stored upload: append the pending record, persist, and
    /// kick off thumbnail derivation in the background.
    pub async fn register(
        &self,
        stored: StoredUpload,
        owner_key: Option<String>,
        title: Option<String>,
    ) -> Result<VideoRecord, IngestError> {
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => DEFAULT_TITLE.to_string(),
        };

        let draft = NewVideo {
            owner_key,
            title,
            path: format!("/uploads/{}", stored.file_name),
            thumbnail_path: PENDING_THUMBNAIL.to_string(),
            upload_date: Utc::now(),
            processing_state: ProcessingState::Pending,
            file_name: stored.file_name,
        };

        let record = self.repo.append(draft).await.map_err(IngestError::Library)?;
        info!(
            "registered video {} ({}, {} bytes)",
            record.id, record.file_name, stored.bytes
        );

        let service = self.clone();
        let background = record.clone();
        tokio::spawn(async move {
            service.derive_thumbnail(&background).await;
        });

        Ok(record)
    }

    /// Derive the thumbnail for one record and settle its processing state.
    /// Runs detached from the request that created the record.
    pub(crate) async fn derive_thumbnail(&self, record: &VideoRecord) {
        let source = self.storage.path_of(&record.file_name);
        let thumb_name = thumbnail_name(&record.file_name);
        let thumb_path = self.thumbnail_dir.join(&thumb_name);

        let derivation = async {
            let duration = self.thumbnailer.media_duration(&source).await?;
            let midpoint = if duration > 0.0 { duration / 2.0 } else { 0.0 };
            self.thumbnailer
                .extract_frame(&source, midpoint, &thumb_path)
                .await
        }
        .await;

        match derivation {
            Ok(()) => {
                let url = format!("/thumbnails/{}", thumb_name);
                match self
                    .repo
                    .set_thumbnail(record.id, &url, ProcessingState::Ready)
                    .await
                {
                    Ok(true) => info!("thumbnail ready for video {}", record.id),
                    Ok(false) => {
                        // Deleted while we were rendering; drop the orphan.
                        info!(
                            "video {} was deleted during thumbnail derivation",
                            record.id
                        );
                        if let Err(e) = tokio::fs::remove_file(&thumb_path).await {
                            warn!("failed to remove orphan thumbnail {:?}: {}", thumb_path, e);
                        }
                    }
                    Err(e) => error!("failed to persist thumbnail for video {}: {}", record.id, e),
                }
            }
            Err(e) => {
                warn!("thumbnail derivation failed for video {}: {}", record.id, e);
                match self
                    .repo
                    .set_thumbnail(record.id, FAILED_THUMBNAIL, ProcessingState::Failed)
                    .await
                {
                    Ok(_) => {}
                    Err(e) => error!(
                        "failed to mark thumbnail failure for video {}: {}",
                        record.id, e
                    ),
                }
            }
        }
    }
}

/// Thumbnail file name derived from the stored original's name.
pub(crate) fn thumbnail_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    format!("{}.jpg", stem)
}
