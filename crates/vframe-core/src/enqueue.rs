//! Accepting a new upload and handing it to the async executor.

use std::sync::Arc;

use tracing::info;

use vframe_models::{JobId, Video, VideoId, VideoJob};

use crate::error::{DomainError, DomainResult};
use crate::ports::{JobDispatcher, Storage, UnitOfWork, UploadStream};

/// Persists an upload as a Video plus a queued Job, then dispatches the
/// job id to the executor.
///
/// Dispatch happens only after the durable commit: a crash before the
/// commit leaves no orphaned dispatch, and a crash after it leaves a
/// queued job waiting to be re-driven (at-least-once gap, accepted).
pub struct EnqueueVideoService {
    uow: Arc<dyn UnitOfWork>,
    storage: Arc<dyn Storage>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl EnqueueVideoService {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        storage: Arc<dyn Storage>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self {
            uow,
            storage,
            dispatcher,
        }
    }

    /// Accept an upload and return the id of the newly queued job.
    pub async fn enqueue(
        &self,
        user_id: &str,
        file: UploadStream,
        filename: &str,
        fps: u32,
    ) -> DomainResult<JobId> {
        if fps == 0 {
            return Err(DomainError::validation("fps must be a positive integer"));
        }

        let storage_ref = self.storage.save_upload(file, filename).await?;

        let video = Video::new(VideoId::new(), user_id, filename, storage_ref);
        let job = VideoJob::new(JobId::new(), video.id.clone(), user_id, fps);

        let mut scope = self.uow.begin().await?;
        scope.add_video(&video).await?;
        scope.add_job(&job).await?;
        scope.commit().await?;

        self.dispatcher.dispatch(&job.id).await?;

        info!(job_id = %job.id, video_id = %video.id, fps, "job enqueued");
        Ok(job.id)
    }
}
