//! Read-only projections of job state for API consumers.

use std::sync::Arc;

use vframe_models::{JobId, JobStatusView, JobSummary};

use crate::error::{DomainError, DomainResult};
use crate::ports::UnitOfWork;

/// Read side of the job store. Every lookup is ownership-checked.
pub struct JobQueryService {
    uow: Arc<dyn UnitOfWork>,
}

impl JobQueryService {
    pub fn new(uow: Arc<dyn UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Full projection of one job. Fails with NotFound when the job does
    /// not exist or belongs to a different user; callers cannot tell the
    /// two cases apart.
    pub async fn get_status(&self, job_id: &JobId, user_id: &str) -> DomainResult<JobStatusView> {
        let mut scope = self.uow.begin().await?;
        let job = scope
            .get_job(job_id)
            .await?
            .filter(|job| job.user_id == user_id)
            .ok_or_else(|| DomainError::not_found("Job not found"))?;
        Ok(JobStatusView::from(&job))
    }

    /// All jobs owned by a user, newest first, in the compact list
    /// projection.
    pub async fn list_for_user(&self, user_id: &str) -> DomainResult<Vec<JobSummary>> {
        let mut scope = self.uow.begin().await?;
        let jobs = scope.jobs_by_user(user_id).await?;
        Ok(jobs.iter().map(JobSummary::from).collect())
    }
}
