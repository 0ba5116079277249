//! Redis Streams job dispatch.
//!
//! This crate provides:
//! - Job-id handoff via Redis Streams (the `JobDispatcher` port)
//! - Worker consumption through a consumer group
//! - Claiming of messages left pending by crashed workers

pub mod error;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::FrameJobMessage;
pub use queue::{JobQueue, QueueConfig};
