//! Best-effort filesystem helpers
//!
//! Partial failures are never swallowed silently: helpers that keep going
//! past an unreadable entry return a report listing what they skipped.

use crate::{Error, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of a recursive size computation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeReport {
    /// Sum of regular file sizes that could be read
    pub bytes: u64,
    /// Entries whose metadata could not be read
    pub skipped: Vec<PathBuf>,
}

impl SizeReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: SizeReport) {
        self.bytes += other.bytes;
        self.skipped.extend(other.skipped);
    }
}

/// Outcome of clearing a directory's contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Number of direct children removed
    pub removed: usize,
    /// Children that could not be removed, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Total size of all regular files below `path`
///
/// A missing `path` yields an empty report.
pub fn dir_size(path: &Path) -> SizeReport {
    let mut report = SizeReport::default();
    if !path.exists() {
        return report;
    }

    for entry in WalkDir::new(path).follow_links(false) {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                match entry.metadata() {
                    Ok(meta) => report.bytes += meta.len(),
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "Skipping unreadable file");
                        report.skipped.push(entry.path().to_path_buf());
                    }
                }
            }
            Err(e) => {
                let skipped = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
                tracing::warn!(path = %skipped.display(), error = %e, "Skipping unreadable entry");
                report.skipped.push(skipped);
            }
        }
    }

    report
}

/// Remove every child of `path`, keeping `path` itself
///
/// A missing `path` yields an empty report. Children that fail to delete are
/// listed in [`CleanupReport::skipped`] and the walk continues.
pub fn clear_dir_contents(path: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return report,
        Err(e) => {
            report.skipped.push((path.to_path_buf(), e.to_string()));
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.skipped.push((path.to_path_buf(), e.to_string()));
                continue;
            }
        };
        let child = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let result = if is_dir {
            std::fs::remove_dir_all(&child)
        } else {
            std::fs::remove_file(&child)
        };
        match result {
            Ok(()) => report.removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %child.display(), error = %e, "Failed to remove");
                report.skipped.push((child, e.to_string()));
            }
        }
    }

    report
}

/// Human-readable byte count, e.g. `1.5 KB`
pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Move a file or directory, falling back to copy + delete across devices
///
/// The destination must not exist. No rollback is attempted if the fallback
/// copy fails partway.
pub fn move_path(src: &Path, dst: &Path) -> Result<()> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Rename crosses devices, copying instead"
            );
            if src.is_dir() {
                copy_dir_recursive(src, dst)?;
                std::fs::remove_dir_all(src)?;
            } else {
                std::fs::copy(src, dst)?;
                std::fs::remove_file(src)?;
            }
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| Error::Internal(format!("Walk failed: {}", e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Internal(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Validate a client-supplied relative path
///
/// Accepts `/`-separated paths made only of normal components. Leading and
/// trailing slashes are stripped first.
pub fn safe_relative_path(rel: &str) -> Result<PathBuf> {
    let trimmed = rel.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Empty relative path".to_string()));
    }

    let path = PathBuf::from(trimmed);
    let all_normal = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal {
        return Err(Error::InvalidInput(format!(
            "Path must stay inside its root: {}",
            rel
        )));
    }

    Ok(path)
}

/// Render a relative path with `/` separators
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1023), "1023.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("/a/b/").unwrap(), PathBuf::from("a/b"));
        assert!(safe_relative_path("../etc").is_err());
        assert!(safe_relative_path("a/../../b").is_err());
        assert!(safe_relative_path("  ").is_err());
    }

    #[test]
    fn test_to_slash_path() {
        assert_eq!(to_slash_path(Path::new("a/b/c.jpg")), "a/b/c.jpg");
    }
}
