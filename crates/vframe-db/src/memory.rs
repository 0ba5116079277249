//! In-memory persistence backend.
//!
//! `begin` hands out a snapshot of the committed state; mutations stay
//! on the snapshot until `commit` writes it back. That gives tests the
//! same commit/rollback observability as the Postgres backend without a
//! running database. Sequential use only; concurrent scopes follow
//! last-commit-wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vframe_core::{
    JobRepository, RepoResult, UnitOfWork, VideoRepository, WorkScope,
};
use vframe_models::{JobId, Video, VideoId, VideoJob};

#[derive(Default)]
struct State {
    videos: HashMap<String, Video>,
    jobs: HashMap<String, VideoJob>,
    commits: usize,
}

/// Shared in-memory database.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<State>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed scopes so far.
    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    /// Committed view of a job, if any.
    pub fn job(&self, id: &JobId) -> Option<VideoJob> {
        self.state.lock().unwrap().jobs.get(id.as_str()).cloned()
    }

    /// Committed view of a video, if any.
    pub fn video(&self, id: &VideoId) -> Option<Video> {
        self.state.lock().unwrap().videos.get(id.as_str()).cloned()
    }

    /// Seed committed state directly (test setup, no commit counted).
    pub fn seed_video(&self, video: Video) {
        self.state
            .lock()
            .unwrap()
            .videos
            .insert(video.id.to_string(), video);
    }

    /// Seed committed state directly (test setup, no commit counted).
    pub fn seed_job(&self, job: VideoJob) {
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(job.id.to_string(), job);
    }
}

struct MemoryScope {
    state: Arc<Mutex<State>>,
    videos: HashMap<String, Video>,
    jobs: HashMap<String, VideoJob>,
}

#[async_trait]
impl VideoRepository for MemoryScope {
    async fn add_video(&mut self, video: &Video) -> RepoResult<()> {
        self.videos.insert(video.id.to_string(), video.clone());
        Ok(())
    }

    async fn get_video(&mut self, id: &VideoId) -> RepoResult<Option<Video>> {
        Ok(self.videos.get(id.as_str()).cloned())
    }
}

#[async_trait]
impl JobRepository for MemoryScope {
    async fn add_job(&mut self, job: &VideoJob) -> RepoResult<()> {
        self.jobs.insert(job.id.to_string(), job.clone());
        Ok(())
    }

    async fn get_job(&mut self, id: &JobId) -> RepoResult<Option<VideoJob>> {
        Ok(self.jobs.get(id.as_str()).cloned())
    }

    async fn update_job(&mut self, job: &VideoJob) -> RepoResult<()> {
        self.jobs.insert(job.id.to_string(), job.clone());
        Ok(())
    }

    async fn jobs_by_user(&mut self, user_id: &str) -> RepoResult<Vec<VideoJob>> {
        let mut jobs: Vec<VideoJob> = self
            .jobs
            .values()
            .filter(|job| job.user_id == user_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

#[async_trait]
impl WorkScope for MemoryScope {
    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let this = *self;
        let mut state = this.state.lock().unwrap();
        state.videos = this.videos;
        state.jobs = this.jobs;
        state.commits += 1;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryDb {
    async fn begin(&self) -> RepoResult<Box<dyn WorkScope>> {
        let state = self.state.lock().unwrap();
        Ok(Box::new(MemoryScope {
            videos: state.videos.clone(),
            jobs: state.jobs.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vframe_models::StorageRef;

    fn sample_video(user: &str) -> Video {
        Video::new(
            VideoId::new(),
            user,
            "video.mp4",
            StorageRef::from("uploads/video.mp4"),
        )
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let db = MemoryDb::new();
        let video = sample_video("alice");
        let job = VideoJob::new(JobId::new(), video.id.clone(), "alice", 1);

        let mut scope = db.begin().await.unwrap();
        scope.add_video(&video).await.unwrap();
        scope.add_job(&job).await.unwrap();
        scope.commit().await.unwrap();

        assert_eq!(db.commits(), 1);
        assert!(db.video(&video.id).is_some());
        assert_eq!(db.job(&job.id).unwrap().user_id, "alice");
    }

    #[tokio::test]
    async fn test_dropped_scope_rolls_back() {
        let db = MemoryDb::new();
        let video = sample_video("alice");

        let mut scope = db.begin().await.unwrap();
        scope.add_video(&video).await.unwrap();
        drop(scope);

        assert_eq!(db.commits(), 0);
        assert!(db.video(&video.id).is_none());
    }

    #[tokio::test]
    async fn test_scope_reads_its_own_writes() {
        let db = MemoryDb::new();
        let video = sample_video("alice");

        let mut scope = db.begin().await.unwrap();
        scope.add_video(&video).await.unwrap();
        let read = scope.get_video(&video.id).await.unwrap();
        assert!(read.is_some());
    }

    #[tokio::test]
    async fn test_jobs_by_user_is_newest_first() {
        let db = MemoryDb::new();
        let video = sample_video("alice");
        db.seed_video(video.clone());

        let mut older = VideoJob::new(JobId::new(), video.id.clone(), "alice", 1);
        older.created_at = older.created_at - chrono::Duration::seconds(60);
        let newer = VideoJob::new(JobId::new(), video.id.clone(), "alice", 2);
        db.seed_job(older.clone());
        db.seed_job(newer.clone());
        db.seed_job(VideoJob::new(JobId::new(), video.id.clone(), "bob", 1));

        let mut scope = db.begin().await.unwrap();
        let jobs = scope.jobs_by_user("alice").await.unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
    }
}
