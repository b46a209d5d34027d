//! Job status and download handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use vup_models::{JobId, JobStatus};
use vup_pipeline::JobResult;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub download_url: String,
}

/// `GET /status/{job_id}` — non-blocking status poll.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = JobId::from_string(job_id);
    let job = state
        .enhancer
        .registry()
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(StatusResponse {
        status: job.status(),
        detail: match job.status() {
            JobStatus::Failed => job.error_message,
            _ => None,
        },
    }))
}

/// `GET /download/{job_id}` — download link, only once the job is done.
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<DownloadResponse>> {
    let id = JobId::from_string(job_id);

    match state.enhancer.result(&id).await {
        JobResult::Ready(path) => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| ApiError::internal("output path has no file name"))?;
            Ok(Json(DownloadResponse {
                download_url: format!("/videos/{name}"),
            }))
        }
        JobResult::NotReady => Err(ApiError::not_found("Result not ready")),
        JobResult::NotFound => Err(ApiError::not_found("Job not found")),
    }
}
