//! Job definitions and lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for an enhancement job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal pipeline stage of a job.
///
/// A job moves `Created -> Extracting -> Upscaling -> Reassembling -> Done`
/// on the frame-batch path; the direct-filter path skips straight from
/// `Created` to `Upscaling` to `Done`. `Failed` is reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Job accepted, pipeline not yet running
    #[default]
    Created,
    /// Decomposing the input into frames
    Extracting,
    /// Upscaling (per-frame batches or direct filter)
    Upscaling,
    /// Muxing upscaled frames back into a container
    Reassembling,
    /// Output available
    Done,
    /// Pipeline aborted
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::Extracting => "extracting",
            JobStage::Upscaling => "upscaling",
            JobStage::Reassembling => "reassembling",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Failed)
    }

    /// External status projection of this stage.
    pub fn status(&self) -> JobStatus {
        match self {
            JobStage::Done => JobStatus::Done,
            JobStage::Failed => JobStatus::Failed,
            _ => JobStatus::Processing,
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status visible to API callers polling a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One end-to-end enhancement request tracked through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Current pipeline stage
    #[serde(default)]
    pub stage: JobStage,

    /// Uploaded input file
    pub input_path: PathBuf,

    /// Final output file, set on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Diagnostic message, set on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job for an uploaded input file.
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            stage: JobStage::Created,
            input_path: input_path.into(),
            output_path: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// External status projection.
    pub fn status(&self) -> JobStatus {
        self.stage.status()
    }

    /// Advance to a new stage. Transitions out of a terminal stage are
    /// ignored so a late stage update cannot resurrect a failed job.
    pub fn advance(&mut self, stage: JobStage) {
        if self.stage.is_terminal() {
            return;
        }
        self.stage = stage;
        self.updated_at = Utc::now();
    }

    /// Mark the job done with its output file.
    pub fn complete(&mut self, output_path: impl Into<PathBuf>) {
        if self.stage.is_terminal() {
            return;
        }
        self.stage = JobStage::Done;
        self.output_path = Some(output_path.into());
        self.updated_at = Utc::now();
    }

    /// Mark the job failed with a diagnostic.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.stage.is_terminal() {
            return;
        }
        self.stage = JobStage::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }
}
