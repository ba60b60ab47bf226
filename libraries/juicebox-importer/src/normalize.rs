//! Loudness normalization
//!
//! Uploads are normalized before they are checksummed, so the checksum describes
//! the bytes the library actually stores.

use crate::{ImportError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// EBU R128 target passed to ffmpeg's `loudnorm` filter
pub const LOUDNORM_FILTER: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// Writes a loudness-normalized copy of `input` to `output`
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<()>;
}

/// FFmpeg `loudnorm` wrapper
///
/// The command is built from an argument vector; no shell is involved, so file
/// names never get interpreted.
#[derive(Debug, Clone)]
pub struct FfmpegNormalizer {
    ffmpeg_path: PathBuf,
}

impl FfmpegNormalizer {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-hide_banner")
            .arg("-nostdin")
            .arg("-y") // Overwrite output file
            .arg("-i")
            .arg(input)
            .arg("-map_metadata")
            .arg("0")
            .arg("-af")
            .arg(LOUDNORM_FILTER)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Normalizer for FfmpegNormalizer {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<()> {
        tracing::debug!(input = %input.display(), output = %output.display(), "Normalizing loudness");

        let result = self.command(input, output).output().await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ImportError::Normalization(format!("FFmpeg failed: {}", stderr)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_passes_paths_as_single_arguments() {
        let normalizer = FfmpegNormalizer::new(PathBuf::from("/usr/bin/ffmpeg"));
        let input = Path::new("/scratch/in; rm -rf ~.mp3");
        let output = Path::new("/scratch/out.mp3");

        let cmd = normalizer.command(input, output);
        let std_cmd = cmd.as_std();
        let args: Vec<_> = std_cmd.get_args().collect();

        assert_eq!(std_cmd.get_program(), "/usr/bin/ffmpeg");
        assert!(args.contains(&input.as_os_str()));
        assert_eq!(args.last(), Some(&output.as_os_str()));
        assert!(args.contains(&std::ffi::OsStr::new(LOUDNORM_FILTER)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let normalizer = FfmpegNormalizer::new(PathBuf::from("/nonexistent/ffmpeg"));
        let result = normalizer
            .normalize(Path::new("/tmp/in.mp3"), Path::new("/tmp/out.mp3"))
            .await;
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
