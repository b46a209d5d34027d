//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the external tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("upscaler binary not found in PATH: {0}")]
    UpscalerNotFound(String),

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: String,
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("probe failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("frame extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("upscale failed: {message}")]
    UpscaleFailed {
        frame: Option<String>,
        message: String,
    },

    #[error("reassembly failed: {0}")]
    ReassemblyFailed(String),

    #[error("audio repair failed: {0}")]
    AudioRepairFailed(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("invalid video file: {0}")]
    InvalidVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a tool failure error.
    pub fn tool_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a probe failure error.
    pub fn probe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ProbeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an upscale failure scoped to a single frame.
    pub fn frame_failed(frame: impl Into<String>, message: impl Into<String>) -> Self {
        let frame = frame.into();
        let message = format!("frame {}: {}", frame, message.into());
        Self::UpscaleFailed {
            frame: Some(frame),
            message,
        }
    }

    /// Create an upscale failure not tied to one frame.
    pub fn upscale_failed(message: impl Into<String>) -> Self {
        Self::UpscaleFailed {
            frame: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_failure_names_the_frame() {
        let err = MediaError::frame_failed("frame_000042.png", "exit status 1");
        let text = err.to_string();
        assert!(text.contains("frame_000042.png"));
        assert!(text.contains("exit status 1"));
    }

    #[test]
    fn test_upscale_failure_without_frame() {
        let err = MediaError::upscale_failed("output set mismatch");
        assert_eq!(err.to_string(), "upscale failed: output set mismatch");
    }
}
