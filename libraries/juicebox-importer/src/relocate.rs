//! Moving finished uploads into the library

use crate::{ImportError, Result};
use std::path::{Path, PathBuf};

/// A library path claimed for one upload
///
/// Claiming creates an empty placeholder with `create_new`, so two uploads can
/// never be handed the same file. The placeholder is removed on drop unless the
/// upload completed and called [`ClaimedPath::keep`].
#[derive(Debug)]
pub struct ClaimedPath {
    path: PathBuf,
    armed: bool,
}

impl ClaimedPath {
    /// Claim `dest`, or the first free of `song-1.mp3`, `song-2.mp3`, ...
    ///
    /// Distinct tags can sanitize to the same path; the counter keeps both files.
    pub async fn claim(dest: &Path) -> Result<Self> {
        let parent = dest.parent().unwrap_or_else(|| Path::new(""));
        let stem = dest
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ImportError::Metadata("Invalid destination filename".to_string()))?;
        let extension = dest.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        tokio::fs::create_dir_all(parent).await?;

        for counter in 0..1000 {
            let candidate = match (counter, extension.is_empty()) {
                (0, _) => dest.to_path_buf(),
                (_, true) => parent.join(format!("{}-{}", stem, counter)),
                (_, false) => parent.join(format!("{}-{}.{}", stem, counter, extension)),
            };

            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await;
            match created {
                Ok(_) => {
                    return Ok(Self {
                        path: candidate,
                        armed: true,
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ImportError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("No free filename for {}", dest.display()),
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file at the path now belongs to the library
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ClaimedPath {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Released library path"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to release library path"
            ),
        }
    }
}

/// Move a file, creating the destination's parent directories
///
/// Uses `rename` and falls back to copy + remove when source and destination
/// live on different filesystems. An existing `dest` is replaced, so callers
/// move onto a [`ClaimedPath`] they own.
pub async fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::rename(source, dest).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                error = %rename_err,
                "Rename failed, falling back to copy"
            );
            if let Err(e) = tokio::fs::copy(source, dest).await {
                let _ = tokio::fs::remove_file(dest).await;
                return Err(e.into());
            }
            tokio::fs::remove_file(source).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_creates_directories() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("upload.mp3");
        std::fs::write(&source, b"data").unwrap();
        let dest = dir.path().join("library/alice/Queen/Song.mp3");

        move_file(&source, &dest).await.unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_claim_appends_counter() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("Queen/Song.mp3");

        let first = ClaimedPath::claim(&dest).await.unwrap();
        assert_eq!(first.path(), dest);
        assert!(dest.exists());

        let second = ClaimedPath::claim(&dest).await.unwrap();
        assert_eq!(second.path(), dir.path().join("Queen/Song-1.mp3"));

        let third = ClaimedPath::claim(&dest).await.unwrap();
        assert_eq!(third.path(), dir.path().join("Queen/Song-2.mp3"));

        // A released claim frees its name again
        drop(second);
        let again = ClaimedPath::claim(&dest).await.unwrap();
        assert_eq!(again.path(), dir.path().join("Queen/Song-1.mp3"));
        drop(third);
        drop(again);
        assert!(first.keep().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_get_distinct_paths() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("alice/Q/A_B.mp3");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dest = dest.clone();
                tokio::spawn(async move { ClaimedPath::claim(&dest).await.unwrap() })
            })
            .collect();
        let mut claims = Vec::new();
        for handle in handles {
            claims.push(handle.await.unwrap());
        }

        let mut paths: Vec<PathBuf> = claims.iter().map(|c| c.path().to_path_buf()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 8);
    }

    #[tokio::test]
    async fn test_move_onto_claimed_path() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("upload.mp3");
        std::fs::write(&source, b"data").unwrap();

        let claim = ClaimedPath::claim(&dir.path().join("library/Song.mp3"))
            .await
            .unwrap();
        move_file(&source, claim.path()).await.unwrap();
        let kept = claim.keep();

        assert_eq!(std::fs::read(&kept).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = move_file(&dir.path().join("missing.mp3"), &dir.path().join("out.mp3")).await;
        assert!(result.is_err());
    }
}
