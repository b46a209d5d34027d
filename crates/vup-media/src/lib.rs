//! FFmpeg and Real-ESRGAN CLI wrappers for video enhancement.
//!
//! This crate provides:
//! - Type-safe command building for multi-input ffmpeg invocations
//! - A runner with per-invocation timeout, kill semantics, and progress
//!   parsing from `-progress pipe:2`
//! - Probing, frame extraction, batched super-resolution, direct filter
//!   upscaling, reassembly, and audio repair
//! - Scoped per-job working directories

pub mod audio;
pub mod command;
pub mod direct;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod reassemble;
pub mod upscale;
pub mod workdir;

pub use audio::repair_audio;
pub use command::{check_ffmpeg, check_ffprobe, run_tool, FfmpegCommand, FfmpegRunner};
pub use direct::upscale_direct;
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frames, frame_name, FRAME_PATTERN};
pub use probe::probe;
pub use progress::FfmpegProgress;
pub use reassemble::reassemble;
pub use upscale::{upscale_frames, Upscaler};
pub use workdir::{resolve_scratch_root, WorkingSet};
