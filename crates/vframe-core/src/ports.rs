//! Collaborator ports.
//!
//! Every external dependency of the job lifecycle is reached through one
//! of these traits. Production adapters live in their own crates
//! (`vframe-storage`, `vframe-media`, `vframe-notify`, `vframe-queue`,
//! `vframe-db`); tests substitute in-memory fakes behind the same
//! contracts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncRead;

use vframe_models::{JobId, StorageRef, Video, VideoId, VideoJob};

use crate::error::{
    DispatchError, ExtractError, NotifyError, RepoResult, StorageError,
};

/// Readable byte stream handed to the storage gateway for uploads.
pub type UploadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Upload, artifact and temp file locations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist an uploaded byte stream, returning an opaque reference.
    async fn save_upload(
        &self,
        reader: UploadStream,
        filename: &str,
    ) -> Result<StorageRef, StorageError>;

    /// Relocate a locally-produced file into durable storage. The file
    /// is removed from its original location.
    async fn save_artifact(&self, local_path: &Path) -> Result<StorageRef, StorageError>;

    /// Create a fresh, uniquely-named temporary directory. The caller
    /// owns it until removal.
    async fn make_temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError>;

    /// Map a durable reference back to a locally readable path.
    fn resolve_path(&self, storage_ref: &StorageRef) -> PathBuf;
}

/// Wrapper around the external transcoder.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Sample `input` at `fps` frames per second into image files under
    /// `out_dir`, returning how many frames were produced. Execution
    /// time is bounded; timeouts and nonzero exits fail with the tool's
    /// diagnostic output.
    async fn extract_frames(
        &self,
        input: &Path,
        out_dir: &Path,
        fps: u32,
    ) -> Result<u64, ExtractError>;
}

/// Outcome reported to the external notification listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Success,
    Error,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Success => "success",
            NotificationStatus::Error => "error",
        }
    }
}

/// Payload delivered to the notification listener on job completion.
#[derive(Debug, Clone, Serialize)]
pub struct JobNotification {
    pub user_id: String,
    pub job_id: JobId,
    pub status: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobNotification {
    /// Build a success notification carrying the artifact reference.
    pub fn success(user_id: impl Into<String>, job_id: JobId, artifact_ref: &StorageRef) -> Self {
        Self {
            user_id: user_id.into(),
            job_id,
            status: NotificationStatus::Success,
            video_url: Some(artifact_ref.to_string()),
            error_message: None,
        }
    }

    /// Build an error notification carrying the failure message.
    pub fn error(user_id: impl Into<String>, job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            job_id,
            status: NotificationStatus::Error,
            video_url: None,
            error_message: Some(message.into()),
        }
    }
}

/// Best-effort delivery of job outcomes to an external listener.
///
/// Implementations retry transient failures a bounded number of times
/// with capped backoff before giving up; callers log and swallow
/// whatever error remains. A failed notification never rolls back job
/// state.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &JobNotification) -> Result<(), NotifyError>;
}

/// Handoff of a job id to the async executor.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job_id: &JobId) -> Result<(), DispatchError>;
}

/// Video persistence operations, valid inside a work scope.
#[async_trait]
pub trait VideoRepository: Send {
    async fn add_video(&mut self, video: &Video) -> RepoResult<()>;
    async fn get_video(&mut self, id: &VideoId) -> RepoResult<Option<Video>>;
}

/// Job persistence operations, valid inside a work scope.
#[async_trait]
pub trait JobRepository: Send {
    async fn add_job(&mut self, job: &VideoJob) -> RepoResult<()>;
    async fn get_job(&mut self, id: &JobId) -> RepoResult<Option<VideoJob>>;
    async fn update_job(&mut self, job: &VideoJob) -> RepoResult<()>;
    /// All jobs owned by a user, newest first.
    async fn jobs_by_user(&mut self, user_id: &str) -> RepoResult<Vec<VideoJob>>;
}

/// One transactional scope over both repositories.
///
/// Writes performed through the scope become durable only on `commit`;
/// dropping an uncommitted scope rolls everything back. No scope ever
/// spans more than one job-state transition.
#[async_trait]
pub trait WorkScope: VideoRepository + JobRepository {
    async fn commit(self: Box<Self>) -> RepoResult<()>;
}

/// Factory for transactional work scopes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn WorkScope>>;
}
