//! Wire format for dispatched work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vframe_models::JobId;

/// The unit handed to workers: an opaque job id plus when it was queued.
///
/// Everything else about the job lives in the job record; workers load
/// it by id, so a redelivered message can never carry stale state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameJobMessage {
    /// Job to process
    pub job_id: JobId,
    /// When the message was enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl FrameJobMessage {
    /// Create a new message for a job id.
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            enqueued_at: Utc::now(),
        }
    }
}
