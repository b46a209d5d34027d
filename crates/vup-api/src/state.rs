//! Application state.

use std::sync::Arc;

use vup_pipeline::{PipelineConfig, VideoEnhancer};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub enhancer: Arc<VideoEnhancer>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let enhancer = VideoEnhancer::new(PipelineConfig::from_env())?;
        Ok(Self {
            config,
            enhancer: Arc::new(enhancer),
        })
    }
}
