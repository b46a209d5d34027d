//! Process-wide job registry.
//!
//! The registry is the only state shared between jobs and the polling API
//! layer. It lives behind a synchronization boundary and exposes only
//! atomic get/insert/update operations; the raw map is never handed out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use vup_models::{Job, JobId, JobStage, JobStatus};

/// Thread-safe mapping from job identifier to job state.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Apply a mutation to a job atomically. Returns false for unknown ids.
    pub async fn update<F>(&self, id: &JobId, mutate: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    /// Advance a job to a new pipeline stage.
    pub async fn advance(&self, id: &JobId, stage: JobStage) {
        self.update(id, |job| job.advance(stage)).await;
    }

    /// Mark a job done with its output path.
    pub async fn complete(&self, id: &JobId, output: PathBuf) {
        self.update(id, |job| job.complete(output)).await;
    }

    /// Mark a job failed with a diagnostic.
    pub async fn fail(&self, id: &JobId, error: impl Into<String>) {
        let error = error.into();
        self.update(id, |job| job.fail(error)).await;
    }

    /// External status of a job.
    pub async fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.jobs.read().await.get(id).map(|job| job.status())
    }

    /// Number of registered jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_status() {
        let registry = JobRegistry::new();
        let job = Job::new("/tmp/in.mp4");
        let id = job.id.clone();

        registry.insert(job).await;
        assert_eq!(registry.status(&id).await, Some(JobStatus::Processing));
        assert_eq!(registry.status(&JobId::new()).await, None);
    }

    #[tokio::test]
    async fn test_complete_and_fail() {
        let registry = JobRegistry::new();
        let job = Job::new("/tmp/in.mp4");
        let id = job.id.clone();
        registry.insert(job).await;

        registry.advance(&id, JobStage::Upscaling).await;
        registry.complete(&id, PathBuf::from("/videos/out.mp4")).await;

        let job = registry.get(&id).await.unwrap();
        assert_eq!(job.status(), JobStatus::Done);
        assert_eq!(job.output_path.as_deref(), Some(std::path::Path::new("/videos/out.mp4")));

        // A late failure cannot un-complete the job
        registry.fail(&id, "too late").await;
        assert_eq!(registry.status(&id).await, Some(JobStatus::Done));
    }

    #[tokio::test]
    async fn test_update_unknown_job() {
        let registry = JobRegistry::new();
        assert!(!registry.update(&JobId::new(), |_| {}).await);
    }

    #[tokio::test]
    async fn test_concurrent_writers_and_readers() {
        let registry = JobRegistry::new();
        let job = Job::new("/tmp/in.mp4");
        let id = job.id.clone();
        registry.insert(job).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                registry.advance(&id, JobStage::Upscaling).await;
                registry.status(&id).await
            }));
        }
        for handle in handles {
            // Every reader observes a coherent status
            assert_eq!(handle.await.unwrap(), Some(JobStatus::Processing));
        }
    }
}
