//! End-to-end lifecycle tests for the enqueue/process/query services,
//! run against in-memory fakes of every port.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use vframe_core::{
    DispatchError, DomainError, EnqueueVideoService, ExtractError, FrameExtractor, JobDispatcher,
    JobNotification, JobQueryService, JobRepository, NotificationStatus, Notifier,
    ProcessVideoService, RepoResult, Storage, StorageError, UnitOfWork, UploadStream,
    VideoRepository, WorkScope,
};
use vframe_models::{JobId, JobStatus, StorageRef, Video, VideoId, VideoJob};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Db {
    videos: HashMap<String, Video>,
    jobs: HashMap<String, VideoJob>,
    commits: usize,
}

/// Snapshot-per-scope unit of work: `begin` clones the committed state,
/// `commit` writes the mutated snapshot back and bumps the counter.
#[derive(Clone, Default)]
struct FakeUow {
    db: Arc<Mutex<Db>>,
}

impl FakeUow {
    fn commits(&self) -> usize {
        self.db.lock().unwrap().commits
    }

    fn job(&self, id: &JobId) -> Option<VideoJob> {
        self.db.lock().unwrap().jobs.get(id.as_str()).cloned()
    }

    /// Seed committed state directly, without counting a commit.
    fn seed_video(&self, video: Video) {
        self.db
            .lock()
            .unwrap()
            .videos
            .insert(video.id.to_string(), video);
    }

    fn seed_job(&self, job: VideoJob) {
        self.db.lock().unwrap().jobs.insert(job.id.to_string(), job);
    }
}

struct FakeScope {
    db: Arc<Mutex<Db>>,
    videos: HashMap<String, Video>,
    jobs: HashMap<String, VideoJob>,
}

#[async_trait]
impl VideoRepository for FakeScope {
    async fn add_video(&mut self, video: &Video) -> RepoResult<()> {
        self.videos.insert(video.id.to_string(), video.clone());
        Ok(())
    }

    async fn get_video(&mut self, id: &VideoId) -> RepoResult<Option<Video>> {
        Ok(self.videos.get(id.as_str()).cloned())
    }
}

#[async_trait]
impl JobRepository for FakeScope {
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
impl WorkScope for FakeScope {
    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let this = *self;
        let mut db = this.db.lock().unwrap();
        db.videos = this.videos;
        db.jobs = this.jobs;
        db.commits += 1;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for FakeUow {
    async fn begin(&self) -> RepoResult<Box<dyn WorkScope>> {
        let db = self.db.lock().unwrap();
        Ok(Box::new(FakeScope {
            videos: db.videos.clone(),
            jobs: db.jobs.clone(),
            db: Arc::clone(&self.db),
        }))
    }
}

/// Local-filesystem storage rooted in a throwaway directory, recording
/// every temp dir it hands out so tests can check cleanup.
struct FakeStorage {
    root: TempDir,
    temp_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeStorage {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            temp_dirs: Mutex::new(Vec::new()),
        }
    }

    fn last_temp_dir(&self) -> PathBuf {
        self.temp_dirs.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn save_upload(
        &self,
        mut reader: UploadStream,
        filename: &str,
    ) -> Result<StorageRef, StorageError> {
        let dir = self.root.path().join("uploads");
        fs::create_dir_all(&dir)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        fs::write(dir.join(filename), buf)?;
        Ok(StorageRef::from(format!("uploads/{filename}")))
    }

    async fn save_artifact(&self, local_path: &Path) -> Result<StorageRef, StorageError> {
        let dir = self.root.path().join("artifacts");
        fs::create_dir_all(&dir)?;
        let name = local_path
            .file_name()
            .expect("artifact has a filename")
            .to_string_lossy()
            .to_string();
        fs::rename(local_path, dir.join(&name))?;
        Ok(StorageRef::from(format!("artifacts/{name}")))
    }

    async fn make_temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.path().join("tmp").join(format!("{prefix}-work"));
        fs::create_dir_all(&dir)?;
        self.temp_dirs.lock().unwrap().push(dir.clone());
        Ok(dir)
    }

    fn resolve_path(&self, storage_ref: &StorageRef) -> PathBuf {
        self.root.path().join(storage_ref.as_str())
    }
}

enum ExtractBehavior {
    /// Write the given files under the output dir, report the count.
    Produce {
        files: Vec<(&'static str, &'static [u8])>,
        reported: u64,
    },
    /// Report an empty extraction.
    Zero,
    /// Fail with the given diagnostic.
    Fail(&'static str),
}

struct FakeExtractor {
    behavior: ExtractBehavior,
    calls: AtomicUsize,
    out_dir_existed: AtomicBool,
}

impl FakeExtractor {
    fn new(behavior: ExtractBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            out_dir_existed: AtomicBool::new(false),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameExtractor for FakeExtractor {
    async fn extract_frames(
        &self,
        _input: &Path,
        out_dir: &Path,
        _fps: u32,
    ) -> Result<u64, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.out_dir_existed
            .store(out_dir.exists(), Ordering::SeqCst);
        match &self.behavior {
            ExtractBehavior::Produce { files, reported } => {
                for (name, data) in files {
                    let path = out_dir.join(name);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, data)?;
                }
                Ok(*reported)
            }
            ExtractBehavior::Zero => Ok(0),
            ExtractBehavior::Fail(message) => Err(ExtractError::failed(*message)),
        }
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<JobNotification>>,
}

impl FakeNotifier {
    fn sent(&self) -> Vec<JobNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, notification: &JobNotification) -> Result<(), vframe_core::NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
struct FakeDispatcher {
    dispatched: Mutex<Vec<JobId>>,
}

impl FakeDispatcher {
    fn dispatched(&self) -> Vec<JobId> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobDispatcher for FakeDispatcher {
    async fn dispatch(&self, job_id: &JobId) -> Result<(), DispatchError> {
        self.dispatched.lock().unwrap().push(job_id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    uow: FakeUow,
    storage: Arc<FakeStorage>,
    notifier: Arc<FakeNotifier>,
}

impl Harness {
    fn new() -> Self {
        Self {
            uow: FakeUow::default(),
            storage: Arc::new(FakeStorage::new()),
            notifier: Arc::new(FakeNotifier::default()),
        }
    }

    fn processor(&self, extractor: Arc<FakeExtractor>) -> ProcessVideoService {
        ProcessVideoService::new(
            Arc::new(self.uow.clone()),
            self.storage.clone(),
            extractor,
            self.notifier.clone(),
        )
    }

    fn queries(&self) -> JobQueryService {
        JobQueryService::new(Arc::new(self.uow.clone()))
    }

    /// Seed a committed video + queued job for `user`.
    fn seed(&self, user: &str, fps: u32) -> (VideoId, JobId) {
        let video = Video::new(
            VideoId::new(),
            user,
            "video.mp4",
            StorageRef::from("uploads/video.mp4"),
        );
        let job = VideoJob::new(JobId::new(), video.id.clone(), user, fps);
        let ids = (video.id.clone(), job.id.clone());
        self.uow.seed_video(video);
        self.uow.seed_job(job);
        ids
    }
}

fn upload(bytes: &[u8]) -> UploadStream {
    Box::new(std::io::Cursor::new(bytes.to_vec()))
}

// ---------------------------------------------------------------------------
// Enqueue + queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enqueue_returns_job_observable_as_queued() {
    let h = Harness::new();
    let dispatcher = Arc::new(FakeDispatcher::default());
    let service = EnqueueVideoService::new(
        Arc::new(h.uow.clone()),
        h.storage.clone(),
        dispatcher.clone(),
    );

    let job_id = service
        .enqueue("alice", upload(b"fake mp4 bytes"), "video.mp4", 5)
        .await
        .unwrap();

    let view = h.queries().get_status(&job_id, "alice").await.unwrap();
    assert_eq!(view.status, JobStatus::Queued);
    assert_eq!(view.fps, 5);
    assert_eq!(view.frame_count, 0);
    assert!(view.artifact_ref.is_none());

    // dispatched exactly once, after the single commit
    assert_eq!(dispatcher.dispatched(), vec![job_id]);
    assert_eq!(h.uow.commits(), 1);

    // the upload is durably resolvable
    let job = h.queries().list_for_user("alice").await.unwrap();
    assert_eq!(job.len(), 1);
}

#[tokio::test]
async fn enqueue_rejects_zero_fps() {
    let h = Harness::new();
    let dispatcher = Arc::new(FakeDispatcher::default());
    let service = EnqueueVideoService::new(
        Arc::new(h.uow.clone()),
        h.storage.clone(),
        dispatcher.clone(),
    );

    let err = service
        .enqueue("alice", upload(b"bytes"), "video.mp4", 0)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(h.uow.commits(), 0);
    assert!(dispatcher.dispatched().is_empty());
}

#[tokio::test]
async fn get_status_is_ownership_checked() {
    let h = Harness::new();
    let (_, job_id) = h.seed("alice", 5);

    let view = h.queries().get_status(&job_id, "alice").await.unwrap();
    assert_eq!(view.fps, 5);

    let err = h.queries().get_status(&job_id, "bob").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn list_for_user_is_newest_first_and_scoped() {
    let h = Harness::new();
    let (_, first) = h.seed("alice", 1);
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (_, second) = h.seed("alice", 2);
    h.seed("bob", 3);

    let jobs = h.queries().list_for_user("alice").await.unwrap();
    let ids: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

// ---------------------------------------------------------------------------
// Process orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn processing_absent_job_is_a_silent_noop() {
    let h = Harness::new();
    let extractor = FakeExtractor::new(ExtractBehavior::Zero);
    let processor = h.processor(extractor.clone());

    processor.execute(&JobId::new()).await.unwrap();

    assert_eq!(h.uow.commits(), 0);
    assert_eq!(extractor.calls(), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn processing_job_with_missing_video_fails_without_extraction() {
    let h = Harness::new();
    // Job referencing a video that was never persisted.
    let job = VideoJob::new(JobId::new(), VideoId::new(), "alice", 1);
    let job_id = job.id.clone();
    h.uow.seed_job(job);

    let extractor = FakeExtractor::new(ExtractBehavior::Zero);
    let processor = h.processor(extractor.clone());
    processor.execute(&job_id).await.unwrap();

    let job = h.uow.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("Video not found"));
    assert!(job.artifact_ref.is_none());
    assert_eq!(extractor.calls(), 0);

    // Running transition + terminal transition
    assert_eq!(h.uow.commits(), 2);

    // terminal state is still notified
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].status, NotificationStatus::Error);
    assert_eq!(sent[0].error_message.as_deref(), Some("Video not found"));
}

#[tokio::test]
async fn processing_with_zero_frames_fails() {
    let h = Harness::new();
    let (_, job_id) = h.seed("alice", 1);

    let extractor = FakeExtractor::new(ExtractBehavior::Zero);
    let processor = h.processor(extractor.clone());
    processor.execute(&job_id).await.unwrap();

    let job = h.uow.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("No frames extracted"));
    assert_eq!(extractor.calls(), 1);
    assert!(!h.storage.last_temp_dir().exists());
}

#[tokio::test]
async fn extractor_failure_message_lands_on_the_job() {
    let h = Harness::new();
    let (_, job_id) = h.seed("alice", 1);

    let extractor = FakeExtractor::new(ExtractBehavior::Fail(
        "moov atom not found: input is truncated",
    ));
    let processor = h.processor(extractor.clone());
    processor.execute(&job_id).await.unwrap();

    let job = h.uow.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(
        job.error.as_deref(),
        Some("moov atom not found: input is truncated")
    );

    // the work dir existed while the extractor ran and is gone now
    assert!(extractor.out_dir_existed.load(Ordering::SeqCst));
    assert!(!h.storage.last_temp_dir().exists());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].error_message.as_deref(),
        Some("moov atom not found: input is truncated")
    );
}

#[tokio::test]
async fn successful_processing_packages_sorted_images() {
    let h = Harness::new();
    let (_, job_id) = h.seed("alice", 2);
    let queued = h.uow.job(&job_id).unwrap();

    let extractor = FakeExtractor::new(ExtractBehavior::Produce {
        files: vec![
            ("nested/00000002.PNG", b"png bytes" as &[u8]),
            ("00000001.jpg", b"jpg bytes"),
            ("ignore.txt", b"not an image"),
        ],
        reported: 2,
    });
    let processor = h.processor(extractor.clone());

    tokio::time::sleep(Duration::from_millis(5)).await;
    processor.execute(&job_id).await.unwrap();

    let job = h.uow.job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.frame_count, 2);
    assert!(job.error.is_none());
    assert!(job.updated_at > queued.updated_at);

    // the archive holds exactly the recognized images, sorted
    let artifact_ref = job.artifact_ref.expect("artifact recorded");
    assert!(artifact_ref
        .as_str()
        .ends_with(&format!("frames_{}.zip", job_id)));
    let path = h.storage.resolve_path(&artifact_ref);
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(names, vec!["00000001.jpg", "nested/00000002.PNG"]);

    // temp tree removed even though packaging succeeded inside it
    assert!(!h.storage.last_temp_dir().exists());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].status, NotificationStatus::Success);
    assert_eq!(sent[0].video_url.as_deref(), Some(artifact_ref.as_str()));
}

#[tokio::test]
async fn terminal_states_are_never_left_running() {
    let h = Harness::new();
    let (_, job_id) = h.seed("alice", 1);

    let extractor = FakeExtractor::new(ExtractBehavior::Fail("boom"));
    let processor = h.processor(extractor);
    processor.execute(&job_id).await.unwrap();

    let job = h.uow.job(&job_id).unwrap();
    assert!(job.is_terminal());
    assert_eq!(h.uow.commits(), 2);
}
