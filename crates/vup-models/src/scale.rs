//! Scale factor policy and target resolution parsing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Discrete multiplier supported by the super-resolution tool.
///
/// Requests for arbitrary resolutions are mapped onto one of these tiers;
/// the value is never interpolated and the smallest tier is never skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScaleFactor {
    X2,
    X3,
    X4,
}

impl ScaleFactor {
    /// Numeric multiplier.
    pub fn multiplier(&self) -> u32 {
        match self {
            ScaleFactor::X2 => 2,
            ScaleFactor::X3 => 3,
            ScaleFactor::X4 => 4,
        }
    }

    /// Argument form expected by the upscaler binary (`-s N`).
    pub fn as_arg(&self) -> &'static str {
        match self {
            ScaleFactor::X2 => "2",
            ScaleFactor::X3 => "3",
            ScaleFactor::X4 => "4",
        }
    }

    /// Select a tier for a requested output resolution.
    ///
    /// 4K-class requests take the largest tier, 1080p/2K the middle one,
    /// everything below the smallest.
    pub fn for_target(target: TargetResolution) -> Self {
        let lines = target.height.min(target.width * 9 / 16);
        if lines >= 2160 {
            ScaleFactor::X4
        } else if lines >= 1080 {
            ScaleFactor::X3
        } else {
            ScaleFactor::X2
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Error parsing a requested resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("invalid resolution format: {0} (expected WIDTHxHEIGHT)")]
    Malformed(String),
    #[error("resolution dimensions must be positive: {0}")]
    NonPositive(String),
}

/// A requested output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TargetResolution {
    pub width: u32,
    pub height: u32,
}

impl TargetResolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse `WIDTHxHEIGHT` (the `WIDTH:HEIGHT` form is also accepted for
    /// compatibility with ffmpeg-style scale arguments).
    pub fn parse(s: &str) -> Result<Self, ResolutionError> {
        let s = s.trim();
        let (w, h) = s
            .split_once(['x', 'X', ':'])
            .ok_or_else(|| ResolutionError::Malformed(s.to_string()))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ResolutionError::Malformed(s.to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ResolutionError::Malformed(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ResolutionError::NonPositive(s.to_string()));
        }
        Ok(Self { width, height })
    }

    /// ffmpeg `scale=` filter operand.
    pub fn as_filter_size(&self) -> String {
        format!("{}:{}", self.width, self.height)
    }
}

impl Default for TargetResolution {
    fn default() -> Self {
        // 1080p, the original service's default output
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl fmt::Display for TargetResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_tiers() {
        // 4K selects the largest tier
        assert_eq!(
            ScaleFactor::for_target(TargetResolution::new(3840, 2160)),
            ScaleFactor::X4
        );
        // 1080p and 1440p select the middle tier
        assert_eq!(
            ScaleFactor::for_target(TargetResolution::new(1920, 1080)),
            ScaleFactor::X3
        );
        assert_eq!(
            ScaleFactor::for_target(TargetResolution::new(2560, 1440)),
            ScaleFactor::X3
        );
        // Anything lower still upscales at the smallest tier
        assert_eq!(
            ScaleFactor::for_target(TargetResolution::new(640, 480)),
            ScaleFactor::X2
        );
        assert_eq!(
            ScaleFactor::for_target(TargetResolution::new(1280, 720)),
            ScaleFactor::X2
        );
    }

    #[test]
    fn test_portrait_target_uses_narrow_dimension() {
        // A 1080x1920 portrait request is 1080p-class, not 4K-class
        assert_eq!(
            ScaleFactor::for_target(TargetResolution::new(1080, 1920)),
            ScaleFactor::X2
        );
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!(
            TargetResolution::parse("1920x1080").unwrap(),
            TargetResolution::new(1920, 1080)
        );
        assert_eq!(
            TargetResolution::parse("1920:1080").unwrap(),
            TargetResolution::new(1920, 1080)
        );
        assert!(TargetResolution::parse("1920").is_err());
        assert!(TargetResolution::parse("0x1080").is_err());
        assert!(TargetResolution::parse("widexhigh").is_err());
    }

    #[test]
    fn test_factor_args() {
        assert_eq!(ScaleFactor::X2.as_arg(), "2");
        assert_eq!(ScaleFactor::X4.multiplier(), 4);
    }
}
