//! Frame-extraction job entity and lifecycle states.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::video::{StorageRef, VideoId};

/// Default sampling rate when the caller does not supply one.
pub const DEFAULT_FPS: u32 = 1;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
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

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle status.
///
/// Transitions are one-directional: Queued -> Running -> Done | Error.
/// Done and Error are terminal; a job never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for a worker
    #[default]
    Queued,
    /// Job is actively being processed
    Running,
    /// Job completed successfully
    Done,
    /// Job failed with an error
    Error,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work: extract frames from one video at a requested rate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoJob {
    /// Unique job ID
    pub id: JobId,

    /// Video this job processes (cascade-deleted with it)
    pub video_id: VideoId,

    /// User ID, duplicated from the video for query efficiency
    pub user_id: String,

    /// Current lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Requested sampling rate (frames per second, always >= 1)
    pub fps: u32,

    /// Number of frames produced, set on success
    #[serde(default)]
    pub frame_count: u64,

    /// Reference to the packaged archive, set iff status == Done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<StorageRef>,

    /// Failure message, set iff status == Error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp, refreshed on every mutation
    pub updated_at: DateTime<Utc>,
}

impl VideoJob {
    /// Create a new queued job for a video.
    pub fn new(id: JobId, video_id: VideoId, user_id: impl Into<String>, fps: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            video_id,
            user_id: user_id.into(),
            status: JobStatus::Queued,
            fps,
            frame_count: 0,
            artifact_ref: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to Running.
    pub fn start(mut self) -> Self {
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
        self
    }

    /// Transition to Done with the produced frame count and artifact.
    pub fn complete(mut self, frame_count: u64, artifact_ref: StorageRef) -> Self {
        self.status = JobStatus::Done;
        self.frame_count = frame_count;
        self.artifact_ref = Some(artifact_ref);
        self.error = None;
        self.updated_at = Utc::now();
        self
    }

    /// Transition to Error with a human-readable message.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Error;
        self.error = Some(error.into());
        self.artifact_ref = None;
        self.updated_at = Utc::now();
        self
    }

    /// Check if the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
