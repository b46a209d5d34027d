//! Scoped per-job working directories.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::MediaResult;

/// Name of the pre-upscale frame directory inside a working set.
pub const FRAMES_SUBDIR: &str = "frames";
/// Name of the post-upscale frame directory inside a working set.
pub const UPSCALED_SUBDIR: &str = "upscaled";

/// Exclusively-owned scratch tree for one pipeline run.
///
/// The directory (and everything under it) is removed when the set is
/// dropped, on success, error, and unwind alike. Nothing outside the
/// orchestrator may assume it outlives the run.
#[derive(Debug)]
pub struct WorkingSet {
    dir: TempDir,
    frames_dir: PathBuf,
    upscaled_dir: PathBuf,
}

impl WorkingSet {
    /// Create a fresh, collision-free working set under `scratch_root`.
    pub fn create(scratch_root: &Path) -> MediaResult<Self> {
        std::fs::create_dir_all(scratch_root)?;

        let dir = tempfile::Builder::new()
            .prefix("vup-")
            .tempdir_in(scratch_root)?;

        let frames_dir = dir.path().join(FRAMES_SUBDIR);
        let upscaled_dir = dir.path().join(UPSCALED_SUBDIR);
        std::fs::create_dir(&frames_dir)?;
        std::fs::create_dir(&upscaled_dir)?;

        debug!("Created working set at {}", dir.path().display());

        Ok(Self {
            dir,
            frames_dir,
            upscaled_dir,
        })
    }

    /// Root of the working set.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory of extracted, pre-upscale frames.
    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Directory of upscaled frames.
    pub fn upscaled_dir(&self) -> &Path {
        &self.upscaled_dir
    }

    /// Path of a scratch file directly under the working set root.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Resolve the scratch root for working sets.
///
/// Prefers the configured directory, then the system temp directory, and
/// finally falls back to an application-owned directory when the system
/// temp is not writable.
pub fn resolve_scratch_root(configured: Option<&Path>, fallback: &Path) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }

    let system_tmp = std::env::temp_dir();
    if is_writable(&system_tmp) {
        return system_tmp;
    }

    tracing::warn!(
        "system temp {} not writable, using {}",
        system_tmp.display(),
        fallback.display()
    );
    fallback.to_path_buf()
}

fn is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".vup-probe-")
        .tempfile_in(dir)
        .is_ok()
}
