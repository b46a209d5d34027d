//! Batched per-frame super-resolution.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

use crate::command::run_tool;
use crate::error::{MediaError, MediaResult};
use crate::frames::FRAME_EXT;
use vup_models::ScaleFactor;

/// Default Real-ESRGAN executable name.
pub const DEFAULT_UPSCALER_BIN: &str = "realesrgan-ncnn-vulkan";
/// Default Real-ESRGAN model.
pub const DEFAULT_UPSCALER_MODEL: &str = "realesrgan-x4plus";

/// Handle to the external single-image super-resolution tool.
#[derive(Debug, Clone)]
pub struct Upscaler {
    /// Executable name or path
    pub binary: String,
    /// Model name passed as `-n`
    pub model: String,
}

impl Default for Upscaler {
    fn default() -> Self {
        Self {
            binary: DEFAULT_UPSCALER_BIN.to_string(),
            model: DEFAULT_UPSCALER_MODEL.to_string(),
        }
    }
}

impl Upscaler {
    pub fn new(binary: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }

    /// Argument vector for one frame invocation.
    fn frame_args(&self, input: &Path, output: &Path, factor: ScaleFactor) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            "-s".to_string(),
            factor.as_arg().to_string(),
            "-n".to_string(),
            self.model.clone(),
        ]
    }
}

/// Upscale every frame in `frames_dir` into `upscaled_dir`.
///
/// Frames are processed in lexicographic (= numeric) order in batches of
/// `batch_size` to bound the tool's peak memory/GPU pressure; invocations
/// within a batch run concurrently, batches strictly in order. The first
/// failing frame aborts the whole operation: a partially upscaled set is
/// never reported as success, because a single corrupted frame would
/// silently corrupt the reassembled video.
pub async fn upscale_frames(
    upscaler: &Upscaler,
    frames_dir: impl AsRef<Path>,
    upscaled_dir: impl AsRef<Path>,
    factor: ScaleFactor,
    batch_size: usize,
    frame_timeout_secs: u64,
) -> MediaResult<()> {
    let frames_dir = frames_dir.as_ref();
    let upscaled_dir = upscaled_dir.as_ref();

    which::which(&upscaler.binary)
        .map_err(|_| MediaError::UpscalerNotFound(upscaler.binary.clone()))?;

    let frames = list_frames(frames_dir)?;
    if frames.is_empty() {
        return Err(MediaError::upscale_failed(format!(
            "no frames to upscale in {}",
            frames_dir.display()
        )));
    }

    info!(
        "Upscaling {} frames at {} in batches of {}",
        frames.len(),
        factor,
        batch_size.max(1)
    );

    for batch in frames.chunks(batch_size.max(1)) {
        let invocations = batch.iter().map(|name| {
            let input = frames_dir.join(name);
            let output = upscaled_dir.join(name);
            let args = upscaler.frame_args(&input, &output, factor);
            let binary = upscaler.binary.clone();

            async move {
                debug!("Upscaling frame {}", name);
                run_tool(&binary, &args, frame_timeout_secs)
                    .await
                    .map_err(|e| MediaError::frame_failed(name.clone(), e.to_string()))?;

                if !output.exists() {
                    return Err(MediaError::frame_failed(
                        name.clone(),
                        "tool exited successfully but produced no output",
                    ));
                }
                Ok(())
            }
        });

        futures::future::try_join_all(invocations).await?;
        metrics::counter!("vup_frames_upscaled_total").increment(batch.len() as u64);
    }

    verify_frame_sets(frames_dir, upscaled_dir)
}

/// List frame files in lexicographic order.
fn list_frames(dir: &Path) -> MediaResult<Vec<String>> {
    let suffix = format!(".{FRAME_EXT}");
    let mut frames: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(&suffix))
        .collect();
    frames.sort();
    Ok(frames)
}

/// Require the upscaled file set to be exactly the extracted file set.
fn verify_frame_sets(frames_dir: &Path, upscaled_dir: &Path) -> MediaResult<()> {
    let expected: BTreeSet<String> = list_frames(frames_dir)?.into_iter().collect();
    let produced: BTreeSet<String> = list_frames(upscaled_dir)?.into_iter().collect();

    if expected == produced {
        return Ok(());
    }

    let missing: Vec<&String> = expected.difference(&produced).collect();
    if let Some(first) = missing.first() {
        return Err(MediaError::upscale_failed(format!(
            "{} of {} frames missing from output, first: {}",
            missing.len(),
            expected.len(),
            first
        )));
    }

    let unexpected: Vec<&String> = produced.difference(&expected).collect();
    Err(MediaError::upscale_failed(format!(
        "{} unexpected files in output, first: {}",
        unexpected.len(),
        unexpected
            .first()
            .map(|s| s.as_str())
            .unwrap_or("<none>")
    )))
}
