//! Video registry: the list/get/create/delete operations behind the API,
//! composing the repository, the intake pipeline and durable storage.

use crate::adapters::fs::FsStorage;
use crate::application::intake::{IngestError, IntakeService, StoredUpload};
use crate::domain::video::VideoRecord;
use crate::ports::repository::VideoRepository;
use crate::ports::thumbnailer::Thumbnailer;
use axum::body::Bytes;
use axum::BoxError;
use futures::Stream;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub enum RegistryError {
    /// Owner-scoped deployment and the caller supplied no owner key.
    MissingOwner,
    NotFound,
    /// Owner key mismatch on delete.
    Forbidden,
    Ingest(IngestError),
    Library(Box<dyn Error + Send + Sync>),
    /// Backing files could not be removed during delete. The metadata
    /// removal has already happened; this is the known inconsistency of the
    /// whole-file persistence design, surfaced rather than rolled back.
    Cleanup(io::Error),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::MissingOwner => write!(f, "an owner key is required"),
            RegistryError::NotFound => write!(f, "video not found"),
            RegistryError::Forbidden => {
                write!(f, "you do not have permission to delete this video")
            }
            RegistryError::Ingest(e) => write!(f, "{}", e),
            RegistryError::Library(e) => write!(f, "metadata store failure: {}", e),
            RegistryError::Cleanup(e) => {
                write!(f, "failed to remove the video's files: {}", e)
            }
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistryError::Ingest(e) => Some(e),
            RegistryError::Cleanup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IngestError> for RegistryError {
    fn from(err: IngestError) -> Self {
        RegistryError::Ingest(err)
    }
}

pub struct RegistryService<R, T> {
    repo: Arc<R>,
    storage: FsStorage,
    intake: IntakeService<R, T>,
    thumbnail_dir: PathBuf,
    owner_required: bool,
}

impl<R, T> RegistryService<R, T>
where
    R: VideoRepository + 'static,
    T: Thumbnailer + 'static,
{
    pub fn new(
        repo: Arc<R>,
        storage: FsStorage,
        thumbnailer: Arc<T>,
        thumbnail_dir: impl Into<PathBuf>,
        owner_required: bool,
    ) -> Self {
        let thumbnail_dir = thumbnail_dir.into();
        let intake = IntakeService::new(
            repo.clone(),
            storage.clone(),
            thumbnailer,
            thumbnail_dir.clone(),
        );
        Self {
            repo,
            storage,
            intake,
            thumbnail_dir,
            owner_required,
        }
    }

    /// Records visible to the caller, newest first. In owner-scoped mode an
    /// owner key is mandatory and the list is filtered to that key.
    pub async fn list(&self, owner: Option<&str>) -> Result<Vec<VideoRecord>, RegistryError> {
        let mut videos = self.repo.all().await.map_err(RegistryError::Library)?;
        if self.owner_required {
            let Some(key) = owner.filter(|k| !k.trim().is_empty()) else {
                return Err(RegistryError::MissingOwner);
            };
            videos.retain(|v| v.owner_key.as_deref() == Some(key));
        }
        Ok(videos)
    }

    pub async fn get(&self, id: u64) -> Result<VideoRecord, RegistryError> {
        self.repo
            .find(id)
            .await
            .map_err(RegistryError::Library)?
            .ok_or(RegistryError::NotFound)
    }

    /// Stream an upload body to storage. The record is only created once
    /// all form fields have arrived, via [`create`](Self::create).
    pub async fn receive_upload<S, E>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredUpload, RegistryError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        Ok(self.intake.receive(original_name, stream).await?)
    }

    /// Validate and register a received upload. On a validation failure the
    /// already-stored file is removed so no orphan remains.
    pub async fn create(
        &self,
        stored: Option<StoredUpload>,
        owner_key: Option<String>,
        title: Option<String>,
    ) -> Result<VideoRecord, RegistryError> {
        let Some(stored) = stored else {
            return Err(RegistryError::Ingest(IngestError::EmptyUpload));
        };

        let owner_key = owner_key.filter(|k| !k.trim().is_empty());
        if self.owner_required && owner_key.is_none() {
            self.discard_upload(&stored).await;
            return Err(RegistryError::MissingOwner);
        }

        Ok(self.intake.register(stored, owner_key, title).await?)
    }

    /// Remove a stored upload that will never get a record, e.g. because the
    /// rest of the form failed to arrive. Removal failures are only logged;
    /// the caller already has an error to report.
    pub async fn discard_upload(&self, stored: &StoredUpload) {
        if let Err(e) = self.storage.remove(&stored.file_name).await {
            warn!(
                "failed to remove abandoned upload {}: {}",
                stored.file_name, e
            );
        }
    }

    /// Delete a record and its backing files. The record goes first: once it
    /// is gone a derivation task finishing mid-delete sees the miss and
    /// cleans up after itself, and the removed record carries the thumbnail
    /// path that was actually current at removal time. A missing file is
    /// fine; a real filesystem error is surfaced after the metadata removal
    /// has been persisted.
    pub async fn delete(&self, id: u64, owner: Option<&str>) -> Result<(), RegistryError> {
        let record = self.get(id).await?;

        if self.owner_mismatch(&record, owner) {
            return Err(RegistryError::Forbidden);
        }

        let removed = self
            .repo
            .remove(id)
            .await
            .map_err(RegistryError::Library)?
            .ok_or(RegistryError::NotFound)?;
        info!("deleted video {}", id);

        let mut cleanup_err: Option<io::Error> = None;
        if let Err(e) = self.storage.remove(&removed.file_name).await {
            cleanup_err = Some(e);
        }
        if let Some(name) = removed.thumbnail_path.strip_prefix("/thumbnails/") {
            match tokio::fs::remove_file(self.thumbnail_dir.join(name)).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    cleanup_err.get_or_insert(e);
                }
                _ => {}
            }
        }

        match cleanup_err {
            Some(e) => Err(RegistryError::Cleanup(e)),
            None => Ok(()),
        }
    }

    fn owner_mismatch(&self, record: &VideoRecord, caller: Option<&str>) -> bool {
        match (record.owner_key.as_deref(), caller) {
            (Some(owner), Some(caller)) => owner != caller,
            // An owned record with no caller key only passes when the
            // deployment does not enforce scoping.
            (Some(_), None) => self.owner_required,
            (None, _) => false,
        }
    }
}
