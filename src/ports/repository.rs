use crate::domain::video::{NewVideo, ProcessingState, VideoRecord};
use async_trait::async_trait;
use std::error::Error;

/// Repository over the video metadata collection. Implementations must
/// serialize every mutation together with its persist under a single
/// mutual-exclusion scope so concurrent uploads and deletes cannot race
/// on the backing store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// All records, most recent first.
    async fn all(&self) -> Result<Vec<VideoRecord>, Box<dyn Error + Send + Sync>>;

    /// Look up a single record by id.
    async fn find(&self, id: u64) -> Result<Option<VideoRecord>, Box<dyn Error + Send + Sync>>;

    /// Assign the next id (max existing + 1), store the record and persist.
    async fn append(&self, draft: NewVideo) -> Result<VideoRecord, Box<dyn Error + Send + Sync>>;

    /// Update thumbnail path and processing state, then persist.
    /// Returns false when the record no longer exists.
    async fn set_thumbnail(
        &self,
        id: u64,
        thumbnail_path: &str,
        state: ProcessingState,
    ) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// Remove a record and persist. Returns the removed record, if any.
    async fn remove(&self, id: u64)
        -> Result<Option<VideoRecord>, Box<dyn Error + Send + Sync>>;
}
