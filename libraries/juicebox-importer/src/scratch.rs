//! Scratch files for in-flight uploads
//!
//! A [`ScratchFile`] owns a UUID-named path inside the scratch directory and removes
//! it when dropped, unless ownership of the bytes was handed on with
//! [`ScratchFile::disarm`].

use crate::Result;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Reserve a fresh scratch path with the given extension (nothing is written yet)
    pub fn reserve(dir: &Path, extension: &str) -> Self {
        let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        Self { path, armed: true }
    }

    /// Stream `reader` into a new scratch file
    pub async fn write_from<R>(dir: &Path, extension: &str, reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        tokio::fs::create_dir_all(dir).await?;

        let scratch = Self::reserve(dir, extension);
        let mut file = tokio::fs::File::create(&scratch.path).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;

        tracing::debug!(path = %scratch.path.display(), bytes = written, "Wrote scratch file");
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop tracking the file; the caller now owns whatever is at the path
    pub fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed scratch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scratch_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let mut data: &[u8] = b"audio bytes";

        let scratch = ScratchFile::write_from(dir.path(), "mp3", &mut data)
            .await
            .unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "mp3");
        assert_eq!(std::fs::read(&path).unwrap(), b"audio bytes");

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_disarmed_scratch_survives() {
        let dir = TempDir::new().unwrap();
        let mut data: &[u8] = b"keep me";

        let scratch = ScratchFile::write_from(dir.path(), "flac", &mut data)
            .await
            .unwrap();
        let path = scratch.disarm();
        assert!(path.exists());
    }

    #[test]
    fn test_reserved_names_are_unique() {
        let dir = Path::new("/tmp/scratch");
        let a = ScratchFile::reserve(dir, "ogg");
        let b = ScratchFile::reserve(dir, "ogg");
        assert_ne!(a.path(), b.path());
    }
}
