//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub upscaler: CheckStatus,
    pub scratch: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

fn check_tool(binary: &str) -> CheckStatus {
    let start = Instant::now();
    match which::which(binary) {
        Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(_) => CheckStatus::error(format!("{binary} not found in PATH")),
    }
}

/// Readiness check endpoint (readiness probe).
///
/// ffmpeg, ffprobe, and a writable scratch root are required; a missing
/// upscaler only degrades the service to the direct filter path, so it is
/// reported but does not fail readiness.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let config = state.enhancer.config();

    let ffmpeg_check = check_tool("ffmpeg");
    let ffprobe_check = check_tool("ffprobe");
    let upscaler_check = check_tool(&config.upscaler.binary);

    let scratch_check = {
        let start = Instant::now();
        let probe = std::fs::create_dir_all(&config.scratch_root).and_then(|_| {
            tempfile::Builder::new()
                .prefix(".ready-")
                .tempfile_in(&config.scratch_root)
                .map(|_| ())
        });
        match probe {
            Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let required_ok = ffmpeg_check.is_ok() && ffprobe_check.is_ok() && scratch_check.is_ok();

    let response = ReadinessResponse {
        status: if required_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg: ffmpeg_check,
            ffprobe: ffprobe_check,
            upscaler: upscaler_check,
            scratch: scratch_check,
        },
    };

    if required_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
