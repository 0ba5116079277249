//! Video upload, job status, listing and archive download.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vframe_core::UploadStream;
use vframe_models::{JobId, JobStatusView, JobSummary, DEFAULT_FPS};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Requested sampling rate; defaults to 1 frame per second.
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub job_id: String,
    pub status: &'static str,
}

/// `POST /videos` — multipart upload, returns 202 with the new job id.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<EnqueueResponse>)> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.bin").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) = upload.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    info!(user_id = %user.user_id, filename, bytes = data.len(), "upload received");

    let stream: UploadStream = Box::new(std::io::Cursor::new(data));
    let job_id = state
        .enqueue
        .enqueue(&user.user_id, stream, &filename, params.fps)
        .await?;

    metrics::counter!("vframe_uploads_total").increment(1);

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            job_id: job_id.to_string(),
            status: "queued",
        }),
    ))
}

/// `GET /videos/{job_id}` — full job projection, 404 when absent or not
/// owned by the caller.
pub async fn get_job_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusView>> {
    let view = state
        .queries
        .get_status(&JobId::from(job_id), &user.user_id)
        .await?;
    Ok(Json(view))
}

/// `GET /videos` — the caller's jobs, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<JobSummary>>> {
    let jobs = state.queries.list_for_user(&user.user_id).await?;
    Ok(Json(jobs))
}

/// `GET /download/{job_id}` — archive bytes; 400 before the job is done,
/// 404 when the job or the artifact file is missing.
pub async fn download_artifact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let view = state
        .queries
        .get_status(&JobId::from(job_id), &user.user_id)
        .await?;

    let artifact_ref = view
        .artifact_ref
        .ok_or_else(|| ApiError::bad_request("Archive not ready"))?;

    let path = state.storage.resolve_path(&artifact_ref);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("Artifact missing"))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("frames.zip")
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
