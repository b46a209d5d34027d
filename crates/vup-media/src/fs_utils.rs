//! Cross-device file moves.
//!
//! The scratch root and the results directory may live on different
//! filesystems, where a plain rename fails with EXDEV.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file, falling back to copy-and-delete across filesystems.
///
/// The fallback copies to a temporary sibling of the destination first and
/// renames it into place, so readers of the destination never observe a
/// half-written file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                "cross-device move {} -> {}, copying",
                src.display(),
                dst.display()
            );

            let staging = dst.with_extension("part");
            fs::copy(src, &staging).await?;
            if let Err(e) = fs::rename(&staging, dst).await {
                let _ = fs::remove_file(&staging).await;
                return Err(MediaError::from(e));
            }
            if let Err(e) = fs::remove_file(src).await {
                tracing::warn!("failed to remove {} after move: {}", src.display(), e);
            }
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

// EXDEV is errno 18 on Linux and macOS.
fn is_cross_device(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_within_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("enhanced.mp4");
        let dst = dir.path().join("results").join("job_upscaled.mp4");

        fs::write(&src, b"container bytes").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"container bytes");
    }

    #[tokio::test]
    async fn test_move_overwrites_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.mp4");
        let dst = dir.path().join("old.mp4");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[test]
    fn test_cross_device_detection() {
        assert!(is_cross_device(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device(&std::io::Error::from_raw_os_error(2)));
    }
}
