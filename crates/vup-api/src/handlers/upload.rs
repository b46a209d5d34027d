//! Upload and audio-fix handlers.

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use vup_media::{probe, repair_audio};
use vup_models::{TargetResolution, VideoAnalysis};
use vup_pipeline::EnhanceStrategy;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub job_id: String,
}

#[derive(Serialize)]
pub struct AudioFixResponse {
    pub download_url: String,
    pub analysis: VideoAnalysis,
}

/// One uploaded video file, already validated.
struct UploadedVideo {
    path: PathBuf,
    resolution: Option<String>,
    mode: Option<String>,
}

/// `POST /upload` — accept a video and begin enhancement.
///
/// Content type and size are verified before any job exists; a rejected
/// upload never reaches the registry.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let uploaded = receive_video(&state, multipart).await?;

    let target = match uploaded.resolution.as_deref() {
        Some(raw) => match TargetResolution::parse(raw) {
            Ok(target) => target,
            Err(e) => {
                cleanup(&uploaded.path).await;
                return Err(ApiError::bad_request(e.to_string()));
            }
        },
        None => TargetResolution::default(),
    };

    let strategy = match uploaded.mode.as_deref() {
        Some("direct") => EnhanceStrategy::DirectFilter(target),
        Some("frames") => EnhanceStrategy::frame_batch_for(target),
        Some(other) => {
            cleanup(&uploaded.path).await;
            return Err(ApiError::bad_request(format!(
                "unknown mode '{other}' (expected 'direct' or 'frames')"
            )));
        }
        // Frame-level super-resolution when the tool is available,
        // otherwise the direct filter path.
        None => {
            if which::which(&state.enhancer.config().upscaler.binary).is_ok() {
                EnhanceStrategy::frame_batch_for(target)
            } else {
                EnhanceStrategy::DirectFilter(target)
            }
        }
    };

    let job_id = state.enhancer.submit(uploaded.path, strategy).await;

    Ok(Json(UploadResponse {
        job_id: job_id.to_string(),
    }))
}

/// `POST /fix-audio` — ensure a video has a playable audio track.
///
/// Runs synchronously: the repaired file is ready when the response
/// returns, matching the polling-free contract of the endpoint.
pub async fn fix_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AudioFixResponse>> {
    let uploaded = receive_video(&state, multipart).await?;
    let config = state.enhancer.config();

    let output_name = format!("{}_audiofixed.mp4", Uuid::new_v4());
    let output = config.results_dir.join(&output_name);

    let result = async {
        let analysis = probe(&uploaded.path).await?;
        if !analysis.has_video {
            return Err(ApiError::bad_request("input has no video stream"));
        }
        repair_audio(
            &uploaded.path,
            &output,
            &analysis,
            &config.encoding,
            config.encode_timeout_secs,
        )
        .await?;
        Ok(analysis)
    }
    .await;

    cleanup(&uploaded.path).await;

    match result {
        Ok(analysis) => Ok(Json(AudioFixResponse {
            download_url: format!("/videos/{output_name}"),
            analysis,
        })),
        Err(e) => {
            cleanup(&output).await;
            Err(e)
        }
    }
}

/// Pull the video file (and optional form fields) out of a multipart
/// request, enforcing the content-type and size checks, and write it into
/// the scratch root.
async fn receive_video(state: &AppState, mut multipart: Multipart) -> ApiResult<UploadedVideo> {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut resolution = None;
    let mut mode = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let is_video = field
                    .content_type()
                    .map(|ct| ct.starts_with("video/"))
                    .unwrap_or(false);
                if !is_video {
                    return Err(ApiError::NotAVideo);
                }

                let filename = field.file_name().unwrap_or("upload.mp4").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                if bytes.len() > state.config.max_upload_size {
                    return Err(ApiError::TooLarge(state.config.max_upload_size));
                }
                file = Some((filename, bytes));
            }
            Some("resolution") => {
                resolution = field.text().await.ok();
            }
            Some("mode") => {
                mode = field.text().await.ok();
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("missing 'file' field"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    // Only the extension survives from the client-supplied name.
    let ext = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("mp4");

    let scratch = &state.enhancer.config().scratch_root;
    tokio::fs::create_dir_all(scratch).await.map_err(|e| {
        ApiError::internal(format!("scratch directory unavailable: {e}"))
    })?;
    let path = scratch.join(format!("upload_{}.{ext}", Uuid::new_v4()));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;

    Ok(UploadedVideo {
        path,
        resolution,
        mode,
    })
}

async fn cleanup(path: &Path) {
    if path.exists() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("failed to remove {}: {}", path.display(), e);
        }
    }
}
