//! Read-side projections of job state for API consumers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobStatus, VideoJob};
use crate::video::StorageRef;

/// Full job projection returned by the status endpoint.
///
/// Timestamps are rendered as RFC 3339 strings so API consumers get a
/// standard textual interchange format regardless of backend.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub fps: u32,
    pub frame_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<StorageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&VideoJob> for JobStatusView {
    fn from(job: &VideoJob) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            fps: job.fps,
            frame_count: job.frame_count,
            artifact_ref: job.artifact_ref.clone(),
            error: job.error.clone(),
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// Compact projection used in per-user listings.
///
/// Error and timestamps are deliberately omitted from the list view.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub fps: u32,
    pub frame_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<StorageRef>,
}

impl From<&VideoJob> for JobSummary {
    fn from(job: &VideoJob) -> Self {
        Self {
            job_id: job.id.to_string(),
            status: job.status,
            fps: job.fps,
            frame_count: job.frame_count,
            artifact_ref: job.artifact_ref.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobId;
    use crate::video::VideoId;

    #[test]
    fn test_status_view_renders_rfc3339() {
        let job = VideoJob::new(JobId::new(), VideoId::new(), "user123", 2);
        let view = JobStatusView::from(&job);

        assert_eq!(view.job_id, job.id.to_string());
        assert_eq!(view.status, JobStatus::Queued);
        // RFC 3339 keeps the date/time separator and an offset
        assert!(view.created_at.contains('T'));
        assert!(view.created_at.ends_with("+00:00") || view.created_at.ends_with('Z'));
    }

    #[test]
    fn test_summary_omits_error_and_timestamps() {
        let job = VideoJob::new(JobId::new(), VideoId::new(), "user123", 1).fail("boom");
        let summary = JobSummary::from(&job);
        let json = serde_json::to_value(&summary).unwrap();

        assert!(json.get("error").is_none());
        assert!(json.get("created_at").is_none());
        assert_eq!(json["status"], "error");
    }
}
