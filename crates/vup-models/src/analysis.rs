//! Probe analysis snapshot and frame rate handling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Immutable metadata snapshot of a media file, as reported by the prober.
///
/// Video fields are zero/`None` when the file carries no video stream;
/// callers gate on `has_video` before trusting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoAnalysis {
    pub has_video: bool,
    pub has_audio: bool,
    /// Codec of the first video stream, if any
    pub video_codec: Option<String>,
    /// Codec of the first audio stream, if any
    pub audio_codec: Option<String>,
    /// Container duration in seconds
    pub duration: f64,
    /// Container size in bytes
    pub size: u64,
    /// Overall bitrate in bits/second
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
    /// Frame rate of the first video stream
    pub frame_rate: FrameRate,
}

impl VideoAnalysis {
    /// Snapshot for a file with no recognizable video stream.
    pub fn without_video() -> Self {
        Self {
            has_video: false,
            has_audio: false,
            video_codec: None,
            audio_codec: None,
            duration: 0.0,
            size: 0,
            bitrate: 0,
            width: 0,
            height: 0,
            frame_rate: FrameRate::ZERO,
        }
    }

    /// Effective frames per second, 0.0 when unknown.
    pub fn fps(&self) -> f64 {
        self.frame_rate.as_f64()
    }
}

/// Error parsing a frame rate expression.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid frame rate: {0}")]
pub struct FrameRateError(pub String);

/// A frame rate as a reduced rational number.
///
/// FFprobe reports `r_frame_rate` as `num/den`. The value is evaluated by
/// strict numeric parsing and division; a zero denominator evaluates to
/// 0 fps instead of dividing by zero. Anything that is not `num/den` or a
/// plain decimal is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const ZERO: FrameRate = FrameRate { num: 0, den: 1 };

    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Evaluate to frames per second. Zero denominator yields 0.0.
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// Parse an ffprobe rate expression such as `"30/1"`, `"30000/1001"`,
    /// or a bare decimal like `"29.97"`.
    pub fn parse(s: &str) -> Result<Self, FrameRateError> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let num: u32 = num
                .trim()
                .parse()
                .map_err(|_| FrameRateError(s.to_string()))?;
            let den: u32 = den
                .trim()
                .parse()
                .map_err(|_| FrameRateError(s.to_string()))?;
            return Ok(Self { num, den });
        }

        // Bare decimal: keep three digits of precision as a rational.
        let value: f64 = s.parse().map_err(|_| FrameRateError(s.to_string()))?;
        if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 / 1000.0 {
            return Err(FrameRateError(s.to_string()));
        }
        Ok(Self {
            num: (value * 1000.0).round() as u32,
            den: 1000,
        })
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_rational() {
        let rate = FrameRate::parse("30/1").unwrap();
        assert_eq!(rate, FrameRate::new(30, 1));
        assert!((rate.as_f64() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ntsc_rational() {
        let rate = FrameRate::parse("30000/1001").unwrap();
        assert!((rate.as_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_decimal() {
        let rate = FrameRate::parse("23.976").unwrap();
        assert!((rate.as_f64() - 23.976).abs() < 0.001);
    }

    #[test]
    fn test_zero_denominator_is_zero_fps() {
        let rate = FrameRate::parse("0/0").unwrap();
        assert_eq!(rate.as_f64(), 0.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(FrameRate::parse("__import__('os')").is_err());
        assert!(FrameRate::parse("30/one").is_err());
        assert!(FrameRate::parse("").is_err());
        assert!(FrameRate::parse("-5/1").is_err());
    }

    #[test]
    fn test_analysis_without_video() {
        let analysis = VideoAnalysis::without_video();
        assert!(!analysis.has_video);
        assert_eq!(analysis.width, 0);
        assert_eq!(analysis.fps(), 0.0);
        assert!(analysis.video_codec.is_none());
    }
}
