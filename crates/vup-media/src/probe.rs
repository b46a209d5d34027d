//! FFprobe media analysis.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use serde::Deserialize;
use vup_models::{FrameRate, VideoAnalysis};

/// Timeout for a single probe invocation.
const PROBE_TIMEOUT_SECS: u64 = 30;

/// FFprobe JSON output shape.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Probe a media file.
///
/// The first-listed video and audio streams win; additional streams are
/// ignored. A file with no video stream still probes successfully, with
/// the video fields zeroed, so the caller decides whether that is fatal.
pub async fn probe(path: impl AsRef<Path>) -> MediaResult<VideoAnalysis> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let invocation = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = tokio::time::timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), invocation)
        .await
        .map_err(|_| MediaError::Timeout(PROBE_TIMEOUT_SECS))??;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            "ffprobe exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_probe_output(&output.stdout)
}

/// Parse ffprobe's JSON into an analysis snapshot.
fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoAnalysis> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

    let format = probe.format.unwrap_or_default();
    let duration = format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0)
        .max(0.0);
    let size = format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let bitrate = format
        .bit_rate
        .as_deref()
        .and_then(|b| b.parse::<u64>().ok())
        .unwrap_or(0);

    let frame_rate = match video_stream.and_then(|s| s.r_frame_rate.as_deref()) {
        Some(raw) => FrameRate::parse(raw)
            .map_err(|e| MediaError::probe_failed(e.to_string(), None))?,
        None => FrameRate::ZERO,
    };

    Ok(VideoAnalysis {
        has_video: video_stream.is_some(),
        has_audio: audio_stream.is_some(),
        video_codec: video_stream.and_then(|s| s.codec_name.clone()),
        audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
        duration,
        size,
        bitrate,
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
        frame_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PROBE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720, "r_frame_rate": "24000/1001"},
            {"codec_type": "audio", "codec_name": "aac"},
            {"codec_type": "audio", "codec_name": "opus"}
        ],
        "format": {"duration": "10.5", "size": "1048576", "bit_rate": "798000"}
    }"#;

    #[test]
    fn test_parse_full_probe() {
        let analysis = parse_probe_output(FULL_PROBE.as_bytes()).unwrap();
        assert!(analysis.has_video);
        assert!(analysis.has_audio);
        assert_eq!(analysis.video_codec.as_deref(), Some("h264"));
        // First-listed audio stream wins
        assert_eq!(analysis.audio_codec.as_deref(), Some("aac"));
        assert_eq!(analysis.width, 1280);
        assert_eq!(analysis.height, 720);
        assert!((analysis.duration - 10.5).abs() < 1e-9);
        assert_eq!(analysis.size, 1048576);
        assert!((analysis.fps() - 23.976).abs() < 0.001);
    }

    #[test]
    fn test_parse_audio_only_file() {
        let json = r#"{
            "streams": [{"codec_type": "audio", "codec_name": "mp3"}],
            "format": {"duration": "3.0", "size": "4096", "bit_rate": "0"}
        }"#;
        let analysis = parse_probe_output(json.as_bytes()).unwrap();
        assert!(!analysis.has_video);
        assert!(analysis.has_audio);
        assert_eq!(analysis.width, 0);
        assert!(analysis.video_codec.is_none());
        assert_eq!(analysis.fps(), 0.0);
    }

    #[test]
    fn test_parse_is_pure() {
        // Probing is idempotent: the same bytes yield the same analysis.
        let a = parse_probe_output(FULL_PROBE.as_bytes()).unwrap();
        let b = parse_probe_output(FULL_PROBE.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_denominator_frame_rate() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "h264", "width": 640, "height": 360, "r_frame_rate": "0/0"}],
            "format": {}
        }"#;
        let analysis = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(analysis.fps(), 0.0);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn test_malformed_frame_rate_is_an_error() {
        let json = r#"{
            "streams": [{"codec_type": "video", "r_frame_rate": "os.system('x')"}],
            "format": {}
        }"#;
        assert!(parse_probe_output(json.as_bytes()).is_err());
    }
}
