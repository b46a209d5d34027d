//! Reassembly of upscaled frames into a video container.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::frames::FRAME_PATTERN;
use vup_models::EncodingConfig;

/// Frame rate used when the probe could not determine one.
pub const FALLBACK_FPS: f64 = 30.0;

/// Mux the upscaled frame sequence back into a single video.
///
/// The video stream always comes from the fresh frame sequence
/// (`-map 0:v:0`); audio, when the source has any, is mapped from the
/// original input (`-map 1:a:0?`) so its sync markers survive instead of
/// being re-derived from frames.
pub async fn reassemble(
    upscaled_dir: impl AsRef<Path>,
    original_input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    fps: f64,
    has_audio: bool,
    encoding: &EncodingConfig,
    timeout_secs: u64,
) -> MediaResult<()> {
    let upscaled_dir = upscaled_dir.as_ref();
    let original_input = original_input.as_ref();
    let output = output.as_ref();

    let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };

    info!(
        "Reassembling {} -> {} at {:.3} fps (audio: {})",
        upscaled_dir.display(),
        output.display(),
        fps,
        has_audio
    );

    let mut cmd = FfmpegCommand::new(upscaled_dir.join(FRAME_PATTERN), output)
        .input_args(["-framerate".to_string(), format!("{fps}")])
        .add_input(original_input)
        .map("0:v:0");

    if has_audio {
        cmd = cmd.map("1:a:0?");
    }

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd.encoding(encoding))
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => e,
            other => MediaError::ReassemblyFailed(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_args(fps: f64, has_audio: bool) -> Vec<String> {
        let mut cmd = FfmpegCommand::new(
            Path::new("/w/upscaled").join(FRAME_PATTERN),
            Path::new("/w/enhanced.mp4"),
        )
        .input_args(["-framerate".to_string(), format!("{fps}")])
        .add_input("/uploads/in.mp4")
        .map("0:v:0");
        if has_audio {
            cmd = cmd.map("1:a:0?");
        }
        cmd.encoding(&EncodingConfig::default()).build_args()
    }

    #[test]
    fn test_reassemble_with_audio() {
        let args = build_args(23.976, true);
        let joined = args.join(" ");
        assert!(joined.contains("-framerate 23.976"));
        assert!(joined.contains("-map 0:v:0"));
        assert!(joined.contains("-map 1:a:0?"));
        assert!(joined.contains("-i /uploads/in.mp4"));
    }

    #[test]
    fn test_reassemble_without_audio() {
        let args = build_args(30.0, false);
        let joined = args.join(" ");
        assert!(joined.contains("-map 0:v:0"));
        assert!(!joined.contains("1:a:0?"));
    }

    #[test]
    fn test_framerate_precedes_frame_input() {
        let args = build_args(24.0, true);
        let framerate = args.iter().position(|a| a == "-framerate").unwrap();
        let first_input = args.iter().position(|a| a == "-i").unwrap();
        assert!(framerate < first_input);
        assert!(args[first_input + 1].ends_with(FRAME_PATTERN));
    }
}
