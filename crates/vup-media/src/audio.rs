//! Audio repair.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use vup_models::{EncodingConfig, VideoAnalysis};

/// Sample rate of the synthesized silent track.
pub const SILENCE_SAMPLE_RATE: u32 = 44_100;

/// Lavfi source for the silent stereo track.
fn silence_source() -> String {
    format!("anullsrc=channel_layout=stereo:sample_rate={SILENCE_SAMPLE_RATE}")
}

/// Guarantee the output file has a playable audio track.
///
/// A source that already has audio is rewrapped with a pure stream copy.
/// A silent source gets a synthesized stereo track muxed against the
/// untouched video stream, truncated to the shorter of the two streams
/// (in practice the video, since the silence is unbounded). Downstream
/// players that mishandle audio-less containers rely on this.
pub async fn repair_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    analysis: &VideoAnalysis,
    encoding: &EncodingConfig,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let cmd = if analysis.has_audio {
        info!("Audio present, rewrapping {} without re-encode", input.display());
        FfmpegCommand::new(input, output).stream_copy()
    } else {
        info!("No audio stream, muxing silence into {}", output.display());
        FfmpegCommand::new(input, output)
            .add_raw_input(["-f", "lavfi"], silence_source())
            .shortest()
            .output_args(["-c:v", "copy"])
            .output_args(["-c:a", encoding.audio_codec.as_str()])
            .output_args(["-b:a", encoding.audio_bitrate.as_str()])
    };

    FfmpegRunner::new()
        .with_timeout(timeout_secs)
        .run(&cmd)
        .await
        .map_err(|e| match e {
            MediaError::FfmpegNotFound => e,
            other => MediaError::AudioRepairFailed(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vup_models::FrameRate;

    fn analysis(has_audio: bool) -> VideoAnalysis {
        VideoAnalysis {
            has_video: true,
            has_audio,
            video_codec: Some("h264".into()),
            audio_codec: has_audio.then(|| "aac".to_string()),
            duration: 10.0,
            size: 1024,
            bitrate: 800_000,
            width: 640,
            height: 360,
            frame_rate: FrameRate::new(24, 1),
        }
    }

    #[test]
    fn test_copy_arm_is_pure_rewrap() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4").stream_copy();
        let args = cmd.build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-c copy"));
        assert!(!joined.contains("lavfi"));
        // analysis says audio is present, so this is the arm repair takes
        assert!(analysis(true).has_audio);
    }

    #[test]
    fn test_silence_arm_command_shape() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .add_raw_input(["-f", "lavfi"], silence_source())
            .shortest()
            .output_args(["-c:v", "copy"])
            .output_args(["-c:a", "aac"])
            .output_args(["-b:a", "128k"]);
        let joined = cmd.build_args().join(" ");
        assert!(joined.contains("-f lavfi -i anullsrc=channel_layout=stereo:sample_rate=44100"));
        assert!(joined.contains("-shortest"));
        assert!(joined.contains("-c:v copy"));
        assert!(joined.contains("-c:a aac"));
    }

    #[test]
    fn test_silence_source_sample_rate() {
        assert!(silence_source().ends_with("sample_rate=44100"));
    }
}
