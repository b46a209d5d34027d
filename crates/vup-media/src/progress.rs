//! FFmpeg progress reporting.

use serde::{Deserialize, Serialize};

/// Progress snapshot from ffmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current encoding rate in frames per second
    pub fps: f64,
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime (1.5 = 1.5x)
    pub speed: f64,
    /// Whether the encode reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of a known total duration (milliseconds) already encoded.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.percentage(10000) - 50.0).abs() < 0.01);
        assert!((progress.percentage(5000) - 100.0).abs() < 0.01);
        // Overshoot clamps to 100
        assert!((progress.percentage(2500) - 100.0).abs() < 0.01);
        // Unknown total is reported as zero progress
        assert_eq!(progress.percentage(0), 0.0);
    }
}
