//! The per-job enhancement pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use vup_media::{
    extract_frames, fs_utils, probe, reassemble, repair_audio, upscale_direct, upscale_frames,
    WorkingSet,
};
use vup_models::{JobId, JobStage, ScaleFactor, TargetResolution};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::registry::JobRegistry;

/// How a job's upscaling is performed.
///
/// One orchestrator, two explicit strategies, instead of parallel
/// copy-pasted pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum EnhanceStrategy {
    /// Decompose into frames, super-resolve each in bounded batches,
    /// reassemble against the original audio.
    FrameBatch(ScaleFactor),
    /// One Lanczos filter pass over the whole container.
    DirectFilter(TargetResolution),
}

impl EnhanceStrategy {
    /// Frame-batch strategy with the factor tier for a requested
    /// resolution.
    pub fn frame_batch_for(target: TargetResolution) -> Self {
        Self::FrameBatch(ScaleFactor::for_target(target))
    }
}

/// Shared context handed to every job task.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<PipelineConfig>,
    pub registry: JobRegistry,
}

/// Run one job to its terminal state.
///
/// Transitions the registry entry through the pipeline stages and into
/// `Done` or `Failed`; never panics the surrounding task on tool errors.
/// The uploaded input file is deleted on both success and failure.
pub async fn run_job(ctx: &PipelineContext, job_id: &JobId, strategy: EnhanceStrategy) {
    let logger = JobLogger::new(job_id, "enhance");

    let Some(job) = ctx.registry.get(job_id).await else {
        warn!("job {} vanished before the pipeline started", job_id);
        return;
    };
    let input = job.input_path.clone();

    logger.log_start(&format!("{:?} on {}", strategy, input.display()));
    metrics::counter!("vup_jobs_started_total").increment(1);

    match enhance(ctx, job_id, &input, strategy, &logger).await {
        Ok(output) => {
            ctx.registry.complete(job_id, output.clone()).await;
            metrics::counter!("vup_jobs_completed_total").increment(1);
            logger.log_completion(&format!("output at {}", output.display()));
        }
        Err(e) => {
            ctx.registry.fail(job_id, e.to_string()).await;
            metrics::counter!("vup_jobs_failed_total").increment(1);
            logger.log_error(&e.to_string());
        }
    }

    if let Err(e) = tokio::fs::remove_file(&input).await {
        warn!("failed to remove uploaded input {}: {}", input.display(), e);
    }
}

/// The pipeline proper. Every intermediate file lives inside the working
/// set, which is removed when this function returns by any path; the
/// result only reaches the results directory through the final move.
async fn enhance(
    ctx: &PipelineContext,
    job_id: &JobId,
    input: &Path,
    strategy: EnhanceStrategy,
    logger: &JobLogger,
) -> PipelineResult<PathBuf> {
    let config = &ctx.config;

    let analysis = probe(input).await?;
    if !analysis.has_video {
        return Err(PipelineError::invalid_input(
            "input has no video stream".to_string(),
        ));
    }

    let workset = WorkingSet::create(&config.scratch_root)
        .map_err(|e| PipelineError::resource(format!("cannot allocate working set: {e}")))?;
    let enhanced = workset.file("enhanced.mp4");

    match strategy {
        EnhanceStrategy::FrameBatch(factor) => {
            ctx.registry.advance(job_id, JobStage::Extracting).await;
            let count = extract_frames(
                input,
                workset.frames_dir(),
                config.fps_cap,
                analysis.fps(),
                config.extract_timeout_secs,
            )
            .await?;
            logger.log_progress(&format!("extracted {count} frames"));

            ctx.registry.advance(job_id, JobStage::Upscaling).await;
            upscale_frames(
                &config.upscaler,
                workset.frames_dir(),
                workset.upscaled_dir(),
                factor,
                config.batch_size,
                config.frame_timeout_secs,
            )
            .await?;
            logger.log_progress(&format!("upscaled {count} frames at {factor}"));

            ctx.registry.advance(job_id, JobStage::Reassembling).await;
            reassemble(
                workset.upscaled_dir(),
                input,
                &enhanced,
                analysis.fps(),
                analysis.has_audio,
                &config.encoding,
                config.encode_timeout_secs,
            )
            .await?;
        }
        EnhanceStrategy::DirectFilter(target) => {
            ctx.registry.advance(job_id, JobStage::Upscaling).await;
            upscale_direct(
                input,
                &enhanced,
                target,
                &config.encoding,
                config.encode_timeout_secs,
            )
            .await?;
        }
    }

    // A silent source leaves the enhanced file without an audio track;
    // downstream players need one.
    let finished = if analysis.has_audio {
        enhanced
    } else {
        logger.log_progress("synthesizing silent audio track");
        let repaired = workset.file("repaired.mp4");
        repair_audio(
            &enhanced,
            &repaired,
            &analysis,
            &config.encoding,
            config.encode_timeout_secs,
        )
        .await?;
        repaired
    };

    let output = config.results_dir.join(format!("{job_id}_upscaled.mp4"));
    fs_utils::move_file(&finished, &output).await?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_batch_for_picks_factor_tier() {
        assert_eq!(
            EnhanceStrategy::frame_batch_for(TargetResolution::new(3840, 2160)),
            EnhanceStrategy::FrameBatch(ScaleFactor::X4)
        );
        assert_eq!(
            EnhanceStrategy::frame_batch_for(TargetResolution::new(640, 480)),
            EnhanceStrategy::FrameBatch(ScaleFactor::X2)
        );
    }

    #[test]
    fn test_strategy_serialization() {
        let strategy = EnhanceStrategy::DirectFilter(TargetResolution::new(1920, 1080));
        let json = serde_json::to_string(&strategy).unwrap();
        assert!(json.contains("direct_filter"));
    }

    #[tokio::test]
    async fn test_missing_job_is_a_noop() {
        let ctx = PipelineContext {
            config: Arc::new(PipelineConfig::default()),
            registry: JobRegistry::new(),
        };
        // Must not panic or insert anything
        run_job(
            &ctx,
            &JobId::new(),
            EnhanceStrategy::DirectFilter(TargetResolution::default()),
        )
        .await;
        assert!(ctx.registry.is_empty().await);
    }
}
