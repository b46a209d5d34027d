//! FFmpeg command builder and subprocess runners.
//!
//! Every external tool is driven through an ordered argument list, never a
//! shell string, and every invocation carries an explicit timeout. A timed
//! out subprocess is killed and reported the same way as a non-zero exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;
use vup_models::EncodingConfig;

/// One `-i` input with its preceding arguments.
#[derive(Debug, Clone)]
struct InputSpec {
    /// Arguments placed before this input's `-i`
    args: Vec<String>,
    /// Path or lavfi/pattern source
    source: String,
}

/// Builder for ffmpeg invocations with one or more inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<InputSpec>,
    output: PathBuf,
    /// Arguments placed after the inputs, before the output path
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command with a single input file.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![InputSpec {
                args: Vec::new(),
                source: input.as_ref().to_string_lossy().to_string(),
            }],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an argument before the most recently added input's `-i`.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            input.args.push(arg.into());
        }
        self
    }

    /// Add multiple arguments before the most recently added input's `-i`.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(input) = self.inputs.last_mut() {
            input.args.extend(args.into_iter().map(Into::into));
        }
        self
    }

    /// Add a second (or further) input. Subsequent `input_arg` calls attach
    /// to this input.
    pub fn add_input(mut self, source: impl AsRef<Path>) -> Self {
        self.inputs.push(InputSpec {
            args: Vec::new(),
            source: source.as_ref().to_string_lossy().to_string(),
        });
        self
    }

    /// Add a non-file input such as a lavfi source, with its own arguments.
    pub fn add_raw_input<I, S>(mut self, args: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(InputSpec {
            args: args.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    /// Add an output argument (after the inputs).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Add an explicit stream mapping (`-map SPEC`).
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Stop writing at the end of the shortest input stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Copy all streams without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Apply a full output encoding profile.
    pub fn encoding(self, config: &EncodingConfig) -> Self {
        self.output_args(config.to_ffmpeg_args())
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the final argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.clone());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for ffmpeg commands with timeout and progress tracking.
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Bound the invocation; the process is killed when the bound elapses.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an ffmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an ffmpeg command, reporting parsed `-progress` lines.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr concurrently: progress lines go to the callback, the
        // tail is kept for diagnostics on failure.
        let stderr = child.stderr.take().expect("stderr not captured");
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut diagnostics = Vec::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current) {
                    progress_callback(progress);
                } else if !line.trim().is_empty() {
                    diagnostics.push(line);
                    if diagnostics.len() > 50 {
                        diagnostics.remove(0);
                    }
                }
            }

            diagnostics.join("\n")
        });

        let status = wait_with_timeout(&mut child, self.timeout_secs, "ffmpeg").await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::tool_failed(
                "ffmpeg",
                "exited with non-zero status",
                Some(stderr_tail),
                status.code(),
            ))
        }
    }
}

/// Run an arbitrary external tool to completion.
///
/// Used for the per-frame super-resolution binary, which has no progress
/// protocol worth parsing; stderr is captured whole for diagnostics.
pub async fn run_tool(program: &str, args: &[String], timeout_secs: u64) -> MediaResult<()> {
    debug!("Running {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(mut pipe) = stderr {
            pipe.read_to_string(&mut buf).await.ok();
        }
        buf
    });

    let status = wait_with_timeout(&mut child, Some(timeout_secs), program).await?;
    let stderr_text = stderr_task.await.unwrap_or_default();

    if status.success() {
        Ok(())
    } else {
        Err(MediaError::tool_failed(
            program,
            "exited with non-zero status",
            Some(stderr_text),
            status.code(),
        ))
    }
}

/// Wait for a child process, killing it if the timeout elapses.
async fn wait_with_timeout(
    child: &mut Child,
    timeout_secs: Option<u64>,
    tool: &str,
) -> MediaResult<std::process::ExitStatus> {
    match timeout_secs {
        Some(secs) => {
            match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => Ok(status?),
                Err(_) => {
                    warn!("{} timed out after {}s, killing process", tool, secs);
                    let _ = child.kill().await;
                    Err(MediaError::Timeout(secs))
                }
            }
        }
        None => Ok(child.wait().await?),
    }
}

/// Parse a line from ffmpeg's `-progress` output.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_us" | "out_time_ms" => {
            // Both keys carry microseconds in modern ffmpeg builds
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            // "continue" or "end"
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Check if ffmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if ffprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_input_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .video_filter("scale=1920:1080:flags=lanczos")
            .encoding(&EncodingConfig::default());

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "in.mp4");
        assert!(args.contains(&"-vf".to_string()));
        assert!(args.contains(&"scale=1920:1080:flags=lanczos".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_multi_input_ordering() {
        let cmd = FfmpegCommand::new("frames/frame_%06d.png", "out.mp4")
            .input_args(["-framerate", "24"])
            .add_input("original.mp4")
            .map("0:v:0")
            .map("1:a:0?");

        let args = cmd.build_args();
        let positions: Vec<usize> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions.len(), 2);
        // -framerate precedes the first -i, and applies to the frame input
        let framerate = args.iter().position(|a| a == "-framerate").unwrap();
        assert!(framerate < positions[0]);
        assert_eq!(args[positions[0] + 1], "frames/frame_%06d.png");
        assert_eq!(args[positions[1] + 1], "original.mp4");
        // maps come after all inputs
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert!(map > positions[1]);
    }

    #[test]
    fn test_raw_input_carries_own_args() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .add_raw_input(["-f", "lavfi"], "anullsrc=channel_layout=stereo:sample_rate=44100")
            .shortest();

        let args = cmd.build_args();
        let lavfi = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[lavfi + 1], "lavfi");
        assert_eq!(args[lavfi + 2], "-i");
        assert!(args[lavfi + 3].starts_with("anullsrc="));
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("out_time_us=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let result = parse_progress_line("progress=end", &mut progress);
        assert!(result.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn test_non_progress_lines_ignored() {
        let mut progress = FfmpegProgress::default();
        assert!(parse_progress_line("Stream mapping:", &mut progress).is_none());
        assert!(parse_progress_line("", &mut progress).is_none());
    }
}
