//! Error types for the domain core and its ports.

use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Result type for domain services.
pub type DomainResult<T> = Result<T, DomainError>;

/// Errors raised by the storage gateway.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage reference: {0}")]
    InvalidRef(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_ref(msg: impl Into<String>) -> Self {
        Self::InvalidRef(msg.into())
    }
}

/// Errors raised by the frame-extraction gateway.
///
/// `Display` of these values is what gets recorded on a failed job, so
/// the tool's own diagnostic text passes through unmodified.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("{0}")]
    Failed(String),

    #[error("ffmpeg timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors raised by the notification gateway after its internal retries
/// are exhausted.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl NotifyError {
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }
}

/// Errors raised when handing a job id to the async executor.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch failed: {0}")]
    Failed(String),
}

impl DispatchError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors raised by the persistence boundary.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Backend(String),
}

impl RepoError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors raised while packaging extracted frames into an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Errors surfaced by the domain services to their callers.
///
/// Job-level failures (extractor errors, missing video, zero frames) are
/// never surfaced here; they terminate the job in the Error state
/// instead. What remains are validation problems and infrastructure
/// failures the caller has to know about.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
