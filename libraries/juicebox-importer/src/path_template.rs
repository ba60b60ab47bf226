//! Canonical library paths
//!
//! Templates are `/`-separated segments with placeholders:
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{Contributor}` | Username of the uploader |
//! | `{Artist}` | Track artist |
//! | `{Album}` | Album title (segment dropped when absent) |
//! | `{Title}` | Track title |
//!
//! Every resolved segment is sanitized on its own, so tag text can never add
//! separators or climb out of the library with `..`.

use std::path::PathBuf;

/// Default path template
pub const DEFAULT_TEMPLATE: &str = "{Contributor}/{Artist}/{Album}/{Title}";

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub contributor: &'a str,
    pub artist: &'a str,
    pub album: Option<&'a str>,
    pub title: &'a str,
}

#[derive(Debug, Clone)]
pub struct PathTemplate {
    template: String,
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Resolve to a path relative to the library root, ending in `.{extension}`
    ///
    /// Segments that resolve to nothing (typically `{Album}` on a single) are
    /// dropped rather than becoming empty directories.
    pub fn resolve(&self, values: &TemplateValues<'_>, extension: &str) -> PathBuf {
        let segments: Vec<String> = self
            .template
            .split('/')
            .map(|segment| resolve_segment(segment, values))
            .filter(|segment| !segment.trim().is_empty())
            .map(|segment| sanitize_path_component(&segment))
            .collect();

        let mut result = PathBuf::new();
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            if i == last {
                result.push(format!("{}.{}", segment, extension));
            } else {
                result.push(segment);
            }
        }

        if segments.is_empty() {
            result.push(format!("{}.{}", sanitize_path_component(values.title), extension));
        }

        result
    }
}

fn resolve_segment(segment: &str, values: &TemplateValues<'_>) -> String {
    segment
        .replace("{Contributor}", values.contributor)
        .replace("{Artist}", values.artist)
        .replace("{Album}", values.album.unwrap_or(""))
        .replace("{Title}", values.title)
}

/// Sanitize a single path component for filesystem safety
///
/// Removes/replaces characters that are invalid on common filesystems
pub fn sanitize_path_component(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| match c {
            // Invalid on Windows: < > : " / \ | ? *
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            // Control characters
            c if c.is_control() => '_',
            // Keep everything else
            c => c,
        })
        .collect();

    // Trim whitespace and dots; also rules out "." and ".."
    let trimmed = sanitized.trim().trim_matches('.').trim();

    // Handle reserved names on Windows
    let reserved = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let upper = trimmed.to_uppercase();
    if reserved.contains(&upper.as_str()) {
        format!("_{}", trimmed)
    } else if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}
