//! The persisted video metadata entity and its lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thumbnail shown while derivation is still running.
pub const PENDING_THUMBNAIL: &str = "/placeholder-pending.jpg";

/// Thumbnail shown when derivation failed or timed out.
pub const FAILED_THUMBNAIL: &str = "/placeholder-failed.jpg";

/// Title applied when the client sends none.
pub const DEFAULT_TITLE: &str = "Untitled video";

/// Thumbnail derivation state. Transitions pending -> ready or
/// pending -> failed exactly once; never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Pending,
    Ready,
    Failed,
}

/// One uploaded video, as persisted in the library file and returned by the
/// API. Field names on the wire are camelCase to match the persisted layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Unique, monotonically assigned, never reused.
    pub id: u64,
    /// Opaque client-supplied identifier used for filtering and ownership
    /// checks. Not authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_key: Option<String>,
    pub title: String,
    /// Stored file name inside the upload directory.
    pub file_name: String,
    /// Public URL of the stored original.
    pub path: String,
    /// Public URL of the thumbnail; a placeholder until derivation settles.
    pub thumbnail_path: String,
    pub upload_date: DateTime<Utc>,
    pub processing_state: ProcessingState,
}

/// A record draft handed to the repository, which assigns the id.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_key: Option<String>,
    pub title: String,
    pub file_name: String,
    pub path: String,
    pub thumbnail_path: String,
    pub upload_date: DateTime<Utc>,
    pub processing_state: ProcessingState,
}
