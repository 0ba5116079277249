//! The job lifecycle state machine.
//!
//! `execute` drives one dispatched job id from its persisted state to a
//! terminal state across two independently-committed transactions: the
//! Running transition commits before the slow extraction step so it is
//! durably visible to concurrent readers, and a failure anywhere in
//! extraction or packaging terminates the job in the Error state instead
//! of leaving it Running.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use vframe_models::{JobId, JobStatus, StorageRef, VideoJob};

use crate::archive;
use crate::error::{ArchiveError, DomainResult, ExtractError, StorageError};
use crate::ports::{FrameExtractor, JobNotification, Notifier, Storage, UnitOfWork};

/// Message recorded when the referenced video has vanished.
const VIDEO_NOT_FOUND: &str = "Video not found";

/// Anything that terminates a job in the Error state.
///
/// `Display` is the message persisted on the job, so extractor
/// diagnostics pass through verbatim.
#[derive(Debug, Error)]
enum JobFailure {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("No frames extracted")]
    NoFrames,

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Packaging(String),
}

/// What the job ended as; input to the best-effort notification.
struct TerminalOutcome {
    user_id: String,
    job_id: JobId,
    status: JobStatus,
    artifact_ref: Option<StorageRef>,
    error: Option<String>,
}

impl TerminalOutcome {
    fn from_job(job: &VideoJob) -> Self {
        Self {
            user_id: job.user_id.clone(),
            job_id: job.id.clone(),
            status: job.status,
            artifact_ref: job.artifact_ref.clone(),
            error: job.error.clone(),
        }
    }

    fn notification(&self) -> JobNotification {
        match (self.status, &self.artifact_ref) {
            (JobStatus::Done, Some(artifact_ref)) => {
                JobNotification::success(&self.user_id, self.job_id.clone(), artifact_ref)
            }
            _ => JobNotification::error(
                &self.user_id,
                self.job_id.clone(),
                self.error.as_deref().unwrap_or("Processing failed"),
            ),
        }
    }
}

/// Removes a scoped temporary directory on every exit path. Removal
/// failures are swallowed; they never escalate past a log line.
struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("failed to remove temp dir {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Executes the full lifecycle for one dispatched job id.
pub struct ProcessVideoService {
    uow: Arc<dyn UnitOfWork>,
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn FrameExtractor>,
    notifier: Arc<dyn Notifier>,
}

impl ProcessVideoService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        storage: Arc<dyn Storage>,
        extractor: Arc<dyn FrameExtractor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            uow,
            storage,
            extractor,
            notifier,
        }
    }

    /// Drive the job to a terminal state and notify the owner.
    ///
    /// An absent job id is a silent no-op. Job-level failures end up on
    /// the job record, not in the returned error; only infrastructure
    /// failures (persistence itself) propagate.
    pub async fn execute(&self, job_id: &JobId) -> DomainResult<()> {
        // First transaction: make the Running state durable before the
        // potentially slow external call.
        {
            let mut scope = self.uow.begin().await?;
            let Some(job) = scope.get_job(job_id).await? else {
                debug!(job_id = %job_id, "job not found at pickup, skipping");
                return Ok(());
            };
            let job = job.start();
            scope.update_job(&job).await?;
            scope.commit().await?;
            info!(job_id = %job_id, "job running");
        }

        // Second transaction: extract, package, and finalize.
        let Some(outcome) = self.run_to_terminal(job_id).await? else {
            return Ok(());
        };

        // Job state is authoritative; the notification is advisory and
        // its failure never propagates.
        if let Err(e) = self.notifier.notify(&outcome.notification()).await {
            warn!(job_id = %job_id, "notification failed: {}", e);
        }

        Ok(())
    }

    async fn run_to_terminal(&self, job_id: &JobId) -> DomainResult<Option<TerminalOutcome>> {
        let mut scope = self.uow.begin().await?;

        let Some(job) = scope.get_job(job_id).await? else {
            debug!(job_id = %job_id, "job vanished before finalize, skipping");
            return Ok(None);
        };

        let Some(video) = scope.get_video(&job.video_id).await? else {
            warn!(job_id = %job_id, video_id = %job.video_id, "referenced video is gone");
            let job = job.fail(VIDEO_NOT_FOUND);
            scope.update_job(&job).await?;
            scope.commit().await?;
            return Ok(Some(TerminalOutcome::from_job(&job)));
        };

        let input_path = self.storage.resolve_path(&video.storage_ref);
        let work_dir = TempDirGuard::new(self.storage.make_temp_dir(job.id.as_str()).await?);

        let result = self
            .extract_and_package(&job, &input_path, work_dir.path())
            .await;

        let job = match result {
            Ok((frame_count, artifact_ref)) => {
                info!(job_id = %job.id, frame_count, "job done");
                job.complete(frame_count, artifact_ref)
            }
            Err(failure) => {
                let message = failure.to_string();
                warn!(job_id = %job.id, "job failed: {}", message);
                job.fail(message)
            }
        };

        scope.update_job(&job).await?;
        scope.commit().await?;
        Ok(Some(TerminalOutcome::from_job(&job)))
        // work_dir dropped here: the temp tree is removed on success and
        // failure alike.
    }

    async fn extract_and_package(
        &self,
        job: &VideoJob,
        input: &Path,
        work_dir: &Path,
    ) -> Result<(u64, StorageRef), JobFailure> {
        let frame_count = self
            .extractor
            .extract_frames(input, work_dir, job.fps)
            .await?;
        if frame_count == 0 {
            return Err(JobFailure::NoFrames);
        }

        let zip_path = work_dir.join(format!("frames_{}.zip", job.id));
        let root = work_dir.to_path_buf();
        let dest = zip_path.clone();
        tokio::task::spawn_blocking(move || archive::write_archive(&root, &dest))
            .await
            .map_err(|e| JobFailure::Packaging(e.to_string()))??;

        let artifact_ref = self.storage.save_artifact(&zip_path).await?;
        Ok((frame_count, artifact_ref))
    }
}
