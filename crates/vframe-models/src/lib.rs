//! Shared data models for the vframe backend.
//!
//! This crate provides Serde-serializable types for:
//! - Videos and their storage references
//! - Frame-extraction jobs and their lifecycle states
//! - Read-side projections returned by the query services

pub mod job;
pub mod projection;
pub mod video;

// Re-export common types
pub use job::{JobId, JobStatus, VideoJob, DEFAULT_FPS};
pub use projection::{JobStatusView, JobSummary};
pub use video::{StorageRef, Video, VideoId};
