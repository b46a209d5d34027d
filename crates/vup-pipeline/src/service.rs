//! The async enhancement service driven by the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info;

use vup_models::{Job, JobId, JobStatus};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{run_job, EnhanceStrategy, PipelineContext};
use crate::registry::JobRegistry;

/// Outcome of a result poll.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    /// Output file path, available once the job is done
    Ready(PathBuf),
    /// Job exists but has not reached a terminal success
    NotReady,
    /// No such job
    NotFound,
}

/// Process-wide enhancement service.
///
/// `submit` registers a job and spawns its pipeline task; `status` and
/// `result` are non-blocking polls against the registry. Concurrency
/// across jobs is bounded by a semaphore; within a job the stages are
/// strictly sequential.
pub struct VideoEnhancer {
    ctx: PipelineContext,
    job_slots: Arc<Semaphore>,
}

impl VideoEnhancer {
    /// Create the service, ensuring the results directory exists.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        std::fs::create_dir_all(&config.results_dir).map_err(|e| {
            PipelineError::resource(format!(
                "cannot create results directory {}: {e}",
                config.results_dir.display()
            ))
        })?;

        let job_slots = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        info!(
            "Enhancer ready: results at {}, scratch at {}, {} job slots",
            config.results_dir.display(),
            config.scratch_root.display(),
            config.max_concurrent_jobs
        );

        Ok(Self {
            ctx: PipelineContext {
                config: Arc::new(config),
                registry: JobRegistry::new(),
            },
            job_slots,
        })
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.ctx.config
    }

    /// The job registry.
    pub fn registry(&self) -> &JobRegistry {
        &self.ctx.registry
    }

    /// Begin orchestration of an uploaded file; returns immediately.
    ///
    /// The job waits in `Created` until a slot frees up, then runs its
    /// pipeline to a terminal state.
    pub async fn submit(&self, input_path: PathBuf, strategy: EnhanceStrategy) -> JobId {
        let job = Job::new(input_path);
        let job_id = job.id.clone();
        self.ctx.registry.insert(job).await;

        let ctx = self.ctx.clone();
        let slots = Arc::clone(&self.job_slots);
        let id = job_id.clone();
        tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                ctx.registry.fail(&id, "service shutting down").await;
                return;
            };
            run_job(&ctx, &id, strategy).await;
        });

        job_id
    }

    /// Non-blocking status poll.
    pub async fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        self.ctx.registry.status(job_id).await
    }

    /// Non-blocking result poll; a path is only returned once the job is
    /// done.
    pub async fn result(&self, job_id: &JobId) -> JobResult {
        match self.ctx.registry.get(job_id).await {
            None => JobResult::NotFound,
            Some(job) => match (job.status(), job.output_path) {
                (JobStatus::Done, Some(path)) => JobResult::Ready(path),
                _ => JobResult::NotReady,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vup_models::TargetResolution;

    fn test_config(dir: &TempDir) -> PipelineConfig {
        PipelineConfig {
            results_dir: dir.path().join("videos"),
            scratch_root: dir.path().join("scratch"),
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_result_gating() {
        let dir = TempDir::new().unwrap();
        let enhancer = VideoEnhancer::new(test_config(&dir)).unwrap();

        assert_eq!(enhancer.result(&JobId::new()).await, JobResult::NotFound);

        // A job that is still processing yields NotReady
        let job = Job::new(dir.path().join("in.mp4"));
        let id = job.id.clone();
        enhancer.registry().insert(job).await;
        assert_eq!(enhancer.result(&id).await, JobResult::NotReady);

        // Once done, the output path is handed out
        let out = dir.path().join("videos").join("out.mp4");
        enhancer.registry().complete(&id, out.clone()).await;
        assert_eq!(enhancer.result(&id).await, JobResult::Ready(out));
    }

    #[tokio::test]
    async fn test_failed_job_never_reports_ready() {
        let dir = TempDir::new().unwrap();
        let enhancer = VideoEnhancer::new(test_config(&dir)).unwrap();

        let job = Job::new(dir.path().join("in.mp4"));
        let id = job.id.clone();
        enhancer.registry().insert(job).await;
        enhancer.registry().fail(&id, "one frame failed").await;

        assert_eq!(enhancer.status(&id).await, Some(JobStatus::Failed));
        assert_eq!(enhancer.result(&id).await, JobResult::NotReady);
    }

    #[tokio::test]
    async fn test_submit_registers_job_immediately() {
        let dir = TempDir::new().unwrap();
        let enhancer = VideoEnhancer::new(test_config(&dir)).unwrap();

        // The input does not exist; the pipeline will fail, but submit
        // itself returns at once with a pollable id.
        let id = enhancer
            .submit(
                dir.path().join("missing.mp4"),
                EnhanceStrategy::DirectFilter(TargetResolution::default()),
            )
            .await;
        assert!(enhancer.status(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_creates_results_dir() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let results = config.results_dir.clone();
        let _enhancer = VideoEnhancer::new(config).unwrap();
        assert!(results.is_dir());
    }
}
