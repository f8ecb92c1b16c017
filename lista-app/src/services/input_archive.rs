//! Input archive ledger
//!
//! Consumed item folders are moved below the archive root under their
//! relative path. Archiving never overwrites: a collision picks the lowest
//! free `__N` suffix. Restoring moves the most recently modified archived
//! generation back into the input root, picking a free `__undoN` suffix if
//! the original location is occupied again.

use crate::models::Item;
use lista_common::fs_utils::{move_path, safe_relative_path};
use lista_common::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Outcome of an archive request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Folder moved to this archive path
    Archived(PathBuf),
    /// Source folder no longer exists (already archived)
    AlreadyGone,
}

impl ArchiveOutcome {
    pub fn is_archived(&self) -> bool {
        matches!(self, ArchiveOutcome::Archived(_))
    }
}

/// Archive ledger for item folders
#[derive(Debug, Clone)]
pub struct InputArchive {
    input_root: PathBuf,
    archive_root: PathBuf,
}

impl InputArchive {
    pub fn new(input_root: PathBuf, archive_root: PathBuf) -> Self {
        Self {
            input_root,
            archive_root,
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Move an item folder into the archive
    ///
    /// A missing source is not an error: duplicate submit or delete requests
    /// are expected and yield [`ArchiveOutcome::AlreadyGone`].
    ///
    /// # Errors
    ///
    /// Move failures propagate. No rollback is attempted, so a failed
    /// cross-device copy can leave the item partially copied.
    pub fn archive(&self, item: &Item) -> Result<ArchiveOutcome> {
        if !item.abs_path.exists() {
            debug!(item = %item.rel_path, "Item already archived");
            return Ok(ArchiveOutcome::AlreadyGone);
        }

        let rel = safe_relative_path(&item.rel_path)?;
        let dest = self.archive_root.join(&rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let target = first_free(&dest, |n| format!("__{}", n));
        move_path(&item.abs_path, &target)?;

        info!(
            item = %item.rel_path,
            archive = %target.display(),
            "Archived item folder"
        );
        Ok(ArchiveOutcome::Archived(target))
    }

    /// Restore the newest archived generation of `rel` into the input root
    ///
    /// Candidates are the exact archived path plus every sibling directory
    /// named `<name>__<digits>`. Returns `false` when nothing matches or the
    /// final move fails; a destination parent created for the move is left
    /// in place.
    pub fn restore(&self, rel: &str) -> Result<bool> {
        let rel = safe_relative_path(rel)?;
        let candidates = self.restore_candidates(&rel)?;

        // Ties keep the later candidate
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for candidate in candidates {
            let modified = std::fs::metadata(&candidate)?.modified()?;
            match &newest {
                Some((best, _)) if modified < *best => {}
                _ => newest = Some((modified, candidate)),
            }
        }

        let Some((_, source)) = newest else {
            debug!(rel = %rel.display(), "Nothing to restore");
            return Ok(false);
        };

        let dest = self.input_root.join(&rel);
        let target = first_free(&dest, |n| format!("__undo{}", n));
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match move_path(&source, &target) {
            Ok(()) => {
                info!(
                    archive = %source.display(),
                    restored = %target.display(),
                    "Restored item folder"
                );
                Ok(true)
            }
            Err(e) => {
                warn!(
                    archive = %source.display(),
                    target = %target.display(),
                    error = %e,
                    "Restore failed"
                );
                Ok(false)
            }
        }
    }

    /// Exact archived path (if present) followed by `name__<digits>` siblings
    fn restore_candidates(&self, rel: &Path) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();

        let exact = self.archive_root.join(rel);
        if exact.exists() {
            candidates.push(exact.clone());
        }

        let Some(base) = rel.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return Ok(candidates);
        };
        let parent = match exact.parent() {
            Some(parent) if parent.is_dir() => parent.to_path_buf(),
            _ => return Ok(candidates),
        };

        let prefix = format!("{}__", base);
        let mut siblings = Vec::new();
        for entry in std::fs::read_dir(&parent)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let is_generation = name
                .strip_prefix(&prefix)
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
            if is_generation && entry.file_type()?.is_dir() {
                siblings.push(entry.path());
            }
        }
        siblings.sort();
        candidates.extend(siblings);

        Ok(candidates)
    }
}

/// `base` itself if free, else the first `base<suffix(n)>` (n = 1, 2, ...) that is
fn first_free(base: &Path, suffix: impl Fn(usize) -> String) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut n = 1;
    loop {
        let candidate = base.with_file_name(format!("{}{}", name, suffix(n)));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
