//! Direct filter-based upscaling.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use vup_models::{EncodingConfig, TargetResolution};

/// Upscale a whole video in a single ffmpeg pass.
///
/// Applies Lanczos resampling to the requested resolution with the shared
/// web encode profile. This path trades per-pixel enhancement quality for
/// speed and never touches the frame directories.
pub async fn upscale_direct(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target: TargetResolution,
    encoding: &EncodingConfig,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    info!(
        "Direct upscale: {} -> {} at {}",
        input.display(),
        output.display(),
        target
    );

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(scale_filter(target))
        .encoding(encoding);

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd)
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => e,
            other => MediaError::upscale_failed(other.to_string()),
        })
}

/// Lanczos scale filter for a target resolution.
fn scale_filter(target: TargetResolution) -> String {
    format!("scale={}:flags=lanczos", target.as_filter_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_filter() {
        assert_eq!(
            scale_filter(TargetResolution::new(1920, 1080)),
            "scale=1920:1080:flags=lanczos"
        );
    }

    #[test]
    fn test_direct_command_shape() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .video_filter(scale_filter(TargetResolution::new(3840, 2160)))
            .encoding(&EncodingConfig::default());
        let args = cmd.build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-vf scale=3840:2160:flags=lanczos"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-crf 18"));
        assert!(joined.contains("-movflags +faststart"));
    }
}
