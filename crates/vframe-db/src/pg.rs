//! Postgres unit-of-work over sqlx.
//!
//! Each `WorkScope` owns one `sqlx::Transaction`; dropping a scope
//! without committing rolls the transaction back, which is exactly the
//! rollback contract the ports specify.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use vframe_core::{
    JobRepository, RepoError, RepoResult, UnitOfWork, VideoRepository, WorkScope,
};
use vframe_models::{JobId, JobStatus, StorageRef, Video, VideoId, VideoJob};

/// Column list for videos queries.
const VIDEO_COLUMNS: &str = "id, user_id, filename, storage_ref, duration, created_at";

/// Column list for video_jobs queries.
const JOB_COLUMNS: &str =
    "id, video_id, user_id, status, fps, frame_count, artifact_ref, error, created_at, updated_at";

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Postgres connection URL
    pub database_url: String,
    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/vframe".to_string(),
            max_connections: 10,
        }
    }
}

impl DbConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/vframe".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

/// Open a connection pool for the configured database.
pub async fn connect(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::backend(e.to_string())
}

#[derive(sqlx::FromRow)]
struct VideoRow {
    id: String,
    user_id: String,
    filename: String,
    storage_ref: String,
    duration: Option<f64>,
    created_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: VideoId::from(row.id),
            user_id: row.user_id,
            filename: row.filename,
            storage_ref: StorageRef::from(row.storage_ref),
            duration: row.duration,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    video_id: String,
    user_id: String,
    status: String,
    fps: i32,
    frame_count: i64,
    artifact_ref: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_from_str(s: &str) -> RepoResult<JobStatus> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "running" => Ok(JobStatus::Running),
        "done" => Ok(JobStatus::Done),
        "error" => Ok(JobStatus::Error),
        other => Err(RepoError::backend(format!("unknown job status: {other}"))),
    }
}

impl TryFrom<JobRow> for VideoJob {
    type Error = RepoError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(VideoJob {
            id: JobId::from(row.id),
            video_id: VideoId::from(row.video_id),
            user_id: row.user_id,
            status: status_from_str(&row.status)?,
            fps: row.fps as u32,
            frame_count: row.frame_count as u64,
            artifact_ref: row.artifact_ref.map(StorageRef::from),
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Factory for Postgres-backed work scopes.
#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn begin(&self) -> RepoResult<Box<dyn WorkScope>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgWorkScope { tx }))
    }
}

struct PgWorkScope {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl VideoRepository for PgWorkScope {
    async fn add_video(&mut self, video: &Video) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, user_id, filename, storage_ref, duration, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(video.id.as_str())
        .bind(&video.user_id)
        .bind(&video.filename)
        .bind(video.storage_ref.as_str())
        .bind(video.duration)
        .bind(video.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_video(&mut self, id: &VideoId) -> RepoResult<Option<Video>> {
        let query = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1");
        let row = sqlx::query_as::<_, VideoRow>(&query)
            .bind(id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(row.map(Video::from))
    }
}

#[async_trait]
impl JobRepository for PgWorkScope {
    async fn add_job(&mut self, job: &VideoJob) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO video_jobs
                (id, video_id, user_id, status, fps, frame_count, artifact_ref, error, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(job.id.as_str())
        .bind(job.video_id.as_str())
        .bind(&job.user_id)
        .bind(job.status.as_str())
        .bind(job.fps as i32)
        .bind(job.frame_count as i64)
        .bind(job.artifact_ref.as_ref().map(|r| r.as_str()))
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_job(&mut self, id: &JobId) -> RepoResult<Option<VideoJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM video_jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.map(VideoJob::try_from).transpose()
    }

    async fn update_job(&mut self, job: &VideoJob) -> RepoResult<()> {
        sqlx::query(
            "UPDATE video_jobs
             SET status = $2, fps = $3, frame_count = $4, artifact_ref = $5,
                 error = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(job.id.as_str())
        .bind(job.status.as_str())
        .bind(job.fps as i32)
        .bind(job.frame_count as i64)
        .bind(job.artifact_ref.as_ref().map(|r| r.as_str()))
        .bind(&job.error)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn jobs_by_user(&mut self, user_id: &str) -> RepoResult<Vec<VideoJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM video_jobs
             WHERE user_id = $1
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(VideoJob::try_from).collect()
    }
}

#[async_trait]
impl WorkScope for PgWorkScope {
    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await.map_err(db_err)
    }
}
