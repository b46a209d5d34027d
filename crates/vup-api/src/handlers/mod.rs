//! HTTP handlers.

pub mod health;
pub mod jobs;
pub mod upload;

pub use health::{health, ready};
pub use jobs::{download, job_status};
pub use upload::{fix_audio, upload};
