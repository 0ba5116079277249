//! Video entity and storage reference types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque locator for a durably-stored blob.
///
/// Only the storage gateway knows how to turn a reference back into a
/// readable path; everything else treats it as an uninterpreted token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StorageRef(pub String);

impl StorageRef {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StorageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StorageRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An uploaded video.
///
/// Created together with its first job by the enqueue service and
/// immutable afterwards in the current scope (duration is recorded for
/// future probing but never mutated today).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    /// Unique video ID
    pub id: VideoId,

    /// User ID (owner)
    pub user_id: String,

    /// Original filename as supplied by the uploader
    pub filename: String,

    /// Where the uploaded bytes live
    pub storage_ref: StorageRef,

    /// Duration in seconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Create a new video record.
    pub fn new(
        id: VideoId,
        user_id: impl Into<String>,
        filename: impl Into<String>,
        storage_ref: StorageRef,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            filename: filename.into(),
            storage_ref,
            duration: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_generation() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_video_creation() {
        let id = VideoId::new();
        let video = Video::new(
            id.clone(),
            "user123",
            "clip.mp4",
            StorageRef::from("uploads/abc-clip.mp4"),
        );

        assert_eq!(video.id, id);
        assert_eq!(video.user_id, "user123");
        assert!(video.duration.is_none());
    }

    #[test]
    fn test_storage_ref_is_transparent_in_json() {
        let r = StorageRef::from("artifacts/frames.zip");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"artifacts/frames.zip\"");
    }
}
