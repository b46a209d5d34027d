//! Pipeline configuration.

use std::path::PathBuf;

use vup_media::upscale::{DEFAULT_UPSCALER_BIN, DEFAULT_UPSCALER_MODEL};
use vup_media::{resolve_scratch_root, Upscaler};
use vup_models::EncodingConfig;

/// Configuration for the enhancement pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Super-resolution tool handle (binary + model)
    pub upscaler: Upscaler,
    /// Frames per super-resolution batch
    pub batch_size: usize,
    /// Extraction frame rate ceiling
    pub fps_cap: f64,
    /// Timeout for frame extraction
    pub extract_timeout_secs: u64,
    /// Timeout for one single-frame upscale
    pub frame_timeout_secs: u64,
    /// Timeout for reassembly, direct upscaling, and audio repair
    pub encode_timeout_secs: u64,
    /// Root directory for per-job working sets
    pub scratch_root: PathBuf,
    /// Directory where finished outputs (and uploads) land
    pub results_dir: PathBuf,
    /// Maximum jobs running concurrently
    pub max_concurrent_jobs: usize,
    /// Output encoding profile
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let results_dir = PathBuf::from("videos");
        Self {
            upscaler: Upscaler::default(),
            batch_size: 10,
            fps_cap: 30.0,
            extract_timeout_secs: 300,
            frame_timeout_secs: 60,
            encode_timeout_secs: 600,
            scratch_root: resolve_scratch_root(None, &results_dir),
            results_dir,
            max_concurrent_jobs: 2,
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let results_dir = PathBuf::from(
            std::env::var("RESULTS_DIR").unwrap_or_else(|_| "videos".to_string()),
        );

        let configured_scratch = std::env::var("SCRATCH_DIR").ok().map(PathBuf::from);
        let scratch_root = resolve_scratch_root(configured_scratch.as_deref(), &results_dir);

        Self {
            upscaler: Upscaler::new(
                std::env::var("REALESRGAN_BIN")
                    .unwrap_or_else(|_| DEFAULT_UPSCALER_BIN.to_string()),
                std::env::var("REALESRGAN_MODEL")
                    .unwrap_or_else(|_| DEFAULT_UPSCALER_MODEL.to_string()),
            ),
            batch_size: std::env::var("PIPELINE_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(10),
            fps_cap: std::env::var("PIPELINE_FPS_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&f: &f64| f > 0.0)
                .unwrap_or(30.0),
            extract_timeout_secs: std::env::var("PIPELINE_EXTRACT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            frame_timeout_secs: std::env::var("PIPELINE_FRAME_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            encode_timeout_secs: std::env::var("PIPELINE_ENCODE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            scratch_root,
            results_dir,
            max_concurrent_jobs: std::env::var("PIPELINE_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(2),
            encoding: EncodingConfig::default(),
        }
    }
}
