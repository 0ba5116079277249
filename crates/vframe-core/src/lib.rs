//! Job lifecycle orchestration for the vframe backend.
//!
//! This crate holds the domain core: the ports every external
//! collaborator is reached through (storage, frame extraction,
//! notification, dispatch, persistence) and the services that drive a
//! job from queued through running to a terminal state.

pub mod archive;
pub mod enqueue;
pub mod error;
pub mod ports;
pub mod process;
pub mod query;

pub use enqueue::EnqueueVideoService;
pub use error::{
    ArchiveError, DispatchError, DomainError, DomainResult, ExtractError, NotifyError, RepoError,
    RepoResult, StorageError,
};
pub use ports::{
    FrameExtractor, JobDispatcher, JobNotification, JobRepository, NotificationStatus, Notifier,
    Storage, UnitOfWork, UploadStream, VideoRepository, WorkScope,
};
pub use process::ProcessVideoService;
pub use query::JobQueryService;
