//! Enhancement pipeline orchestration.
//!
//! This crate provides:
//! - The process-wide job registry behind a synchronization boundary
//! - The per-job pipeline state machine (probe, extract, upscale,
//!   reassemble, audio repair) with unconditional scratch cleanup
//! - `VideoEnhancer`, the async submit/status/result service the HTTP
//!   layer drives

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod service;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use pipeline::EnhanceStrategy;
pub use registry::JobRegistry;
pub use service::{JobResult, VideoEnhancer};
