//! Axum HTTP API server.
//!
//! Thin glue over the enhancement pipeline:
//! - Multipart upload with content-type and size validation
//! - Non-blocking status/download polling
//! - Synchronous audio repair endpoint
//! - Health/readiness probes and Prometheus metrics
//! - Static serving of finished outputs

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
