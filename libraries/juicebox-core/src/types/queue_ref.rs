//! Device-resolvable song references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A pointer the playback daemon can resolve to the exact bytes of a song
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueRef(String);

impl QueueRef {
    /// Wrap an already-resolved reference
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps library storage paths onto references the playback daemon resolves
///
/// Songs are stored below `library_dir`. The daemon sees the same tree at
/// `device_root` (its music directory), which may be a different mount point.
/// Paths below either root become root-relative references, which is what an
/// MPD database resolves. Anything else is handed over as an absolute `file://`
/// URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRoot {
    library_dir: PathBuf,
    device_root: PathBuf,
}

impl MediaRoot {
    /// Library directory shared with the daemon under the same path
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        let library_dir = library_dir.into();
        Self {
            device_root: library_dir.clone(),
            library_dir,
        }
    }

    /// Set where the daemon sees the library directory
    pub fn with_device_root(mut self, device_root: impl Into<PathBuf>) -> Self {
        self.device_root = device_root.into();
        self
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub fn device_root(&self) -> &Path {
        &self.device_root
    }

    /// Build the queue reference for a canonical storage path
    pub fn queue_ref(&self, location: &Path) -> QueueRef {
        let location = normalized(location);
        let relative = [&self.library_dir, &self.device_root]
            .into_iter()
            .find_map(|root| relative_parts(&location, &normalized(root)));
        if let Some(parts) = relative {
            return QueueRef(parts.join("/"));
        }

        let absolute = if location.is_absolute() {
            location
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&location))
                .unwrap_or(location)
        };
        match url::Url::from_file_path(&absolute) {
            Ok(url) => QueueRef(url.to_string()),
            Err(()) => QueueRef(format!("file://{}", absolute.display())),
        }
    }
}

/// Drop `.` components so `./data/music` and `data/music` compare equal
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn relative_parts(location: &Path, root: &Path) -> Option<Vec<String>> {
    let relative = location.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then_some(parts)
}
