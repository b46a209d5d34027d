//! Frame extraction.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Zero-padded frame filename pattern shared by the extractor and the
/// reassembler. Padding to six digits keeps lexicographic order equal to
/// numeric order for any realistic frame count.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Extension of extracted frames.
pub const FRAME_EXT: &str = "png";

/// Name of the frame with the given 1-based sequence number.
pub fn frame_name(seq: u32) -> String {
    format!("frame_{:06}.{}", seq, FRAME_EXT)
}

/// Decompose a video into still frames.
///
/// Samples at the native frame rate, capped at `cap_fps`; a source below
/// the cap keeps its native rate, a source above it is downsampled. An
/// unknown native rate samples at the cap. Returns the number of frames
/// written; zero frames is a failure, not a success.
pub async fn extract_frames(
    input: impl AsRef<Path>,
    frames_dir: impl AsRef<Path>,
    cap_fps: f64,
    native_fps: f64,
    timeout_secs: u64,
) -> MediaResult<usize> {
    let input = input.as_ref();
    let frames_dir = frames_dir.as_ref();

    let effective_fps = if native_fps > 0.0 {
        native_fps.min(cap_fps)
    } else {
        cap_fps
    };

    info!(
        "Extracting frames: {} -> {} at {:.3} fps",
        input.display(),
        frames_dir.display(),
        effective_fps
    );

    let cmd = FfmpegCommand::new(input, frames_dir.join(FRAME_PATTERN))
        .video_filter(format!("fps={effective_fps}"))
        .output_args(["-q:v", "2"]);

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd)
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => e,
            other => MediaError::ExtractionFailed(other.to_string()),
        })?;

    let count = count_frames(frames_dir)?;
    if count == 0 {
        return Err(MediaError::ExtractionFailed(format!(
            "no frames produced in {}",
            frames_dir.display()
        )));
    }

    info!("Extracted {} frames", count);
    Ok(count)
}

/// Count frame files in a directory.
fn count_frames(dir: &Path) -> MediaResult<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(&format!(".{FRAME_EXT}"))
        {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_frame_name_padding() {
        assert_eq!(frame_name(1), "frame_000001.png");
        assert_eq!(frame_name(42), "frame_000042.png");
        assert_eq!(frame_name(123456), "frame_123456.png");
    }

    #[test]
    fn test_lexicographic_order_matches_numeric() {
        let mut names: Vec<String> = [900, 2, 100, 11, 1].iter().map(|&n| frame_name(n)).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                frame_name(1),
                frame_name(2),
                frame_name(11),
                frame_name(100),
                frame_name(900)
            ]
        );
    }

    #[test]
    fn test_count_frames_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(frame_name(1)), b"x").unwrap();
        std::fs::write(dir.path().join(frame_name(2)), b"x").unwrap();
        std::fs::write(dir.path().join("audit.log"), b"x").unwrap();
        assert_eq!(count_frames(dir.path()).unwrap(), 2);
    }

    #[test]
    fn test_extraction_command_shape() {
        let cmd = FfmpegCommand::new("in.mp4", Path::new("/work/frames").join(FRAME_PATTERN))
            .video_filter("fps=24")
            .output_args(["-q:v", "2"]);
        let args = cmd.build_args();
        assert!(args.contains(&"fps=24".to_string()));
        assert!(args.contains(&"-q:v".to_string()));
        assert!(args.last().unwrap().ends_with("frame_%06d.png"));
    }
}
