//! Ad directory bookkeeping
//!
//! Pending ads live below the pending root, one folder per submitted item,
//! each holding an `ad_*.yaml` definition plus its cropped images. After a
//! successful publish every pending folder is promoted to the archived root.
//! Promotion never overwrites: an existing archived folder is merged into
//! file by file and colliding files get a timestamp suffix.

use crate::models::{AdDefinition, Item, PendingAd};
use lista_common::fs_utils::{move_path, safe_relative_path, to_slash_path};
use lista_common::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File name pattern identifying an ad folder (`.yaml` or `.yml`)
pub const AD_FILE_PATTERN: &str = "ad_*.y*ml";

/// Outcome of promoting all pending ads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoteReport {
    /// Folders relocated wholesale
    pub moved: Vec<String>,
    /// Folders merged into an existing archived folder
    pub merged: Vec<String>,
    /// Incoming files renamed to avoid overwriting, as final paths
    pub renamed: Vec<PathBuf>,
    /// Source folders that could not be removed after merging
    pub leftover: Vec<PathBuf>,
}

/// Slug used in ad file names
///
/// Lower-cases, replaces every run of characters outside `[a-z0-9]` with a
/// single `-` and trims dashes. Falls back to `item`.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

/// Every ad definition file below `root`, sorted by path
pub fn find_ad_files(root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = glob::Pattern::new(AD_FILE_PATTERN)
        .map_err(|e| Error::Internal(format!("Invalid ad file pattern: {}", e)))?;

    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry while scanning ads");
                continue;
            }
        };
        if entry.file_type().is_file()
            && pattern.matches(&entry.file_name().to_string_lossy())
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Pending and archived ad folders
#[derive(Debug, Clone)]
pub struct AdStore {
    pending_root: PathBuf,
    archive_root: PathBuf,
}

impl AdStore {
    pub fn new(pending_root: PathBuf, archive_root: PathBuf) -> Self {
        Self {
            pending_root,
            archive_root,
        }
    }

    pub fn pending_root(&self) -> &Path {
        &self.pending_root
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Pending folder for an item (not created)
    pub fn ad_dir_for(&self, item: &Item) -> Result<PathBuf> {
        Ok(self.pending_root.join(safe_relative_path(&item.rel_path)?))
    }

    /// Write the ad definition for `item` into `ad_dir`
    pub fn write_ad(&self, item: &Item, metadata: &Map<String, Value>, ad_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(ad_dir)?;

        let ad = AdDefinition::from_metadata(metadata);
        let yaml = serde_yaml::to_string(&ad)
            .map_err(|e| Error::Internal(format!("Failed to encode ad definition: {}", e)))?;

        let ad_file = ad_dir.join(format!("ad_{}.yaml", slugify(&item.name)));
        std::fs::write(&ad_file, yaml)?;

        info!(item = %item.rel_path, file = %ad_file.display(), "Wrote ad definition");
        Ok(ad_file)
    }

    /// Pending ads sorted by folder
    ///
    /// Unreadable definition files are listed with empty fields.
    pub fn list_pending(&self) -> Result<Vec<PendingAd>> {
        let mut ads = Vec::new();
        for file in find_ad_files(&self.pending_root)? {
            let Some(dir) = file.parent() else { continue };
            let rel_dir = dir
                .strip_prefix(&self.pending_root)
                .map(to_slash_path)
                .unwrap_or_default();

            let data = match std::fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_yaml::from_str::<serde_yaml::Value>(&s).map_err(|e| e.to_string()))
            {
                Ok(data) => data,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Unreadable ad definition");
                    serde_yaml::Value::Null
                }
            };

            ads.push(PendingAd {
                dir: rel_dir,
                file: file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                title: yaml_text(&data, "title"),
                category: yaml_text(&data, "category"),
                price: data.get("price").and_then(serde_yaml::Value::as_i64),
            });
        }

        ads.sort_by(|a, b| a.dir.cmp(&b.dir));
        Ok(ads)
    }

    /// Delete a pending ad folder; returns whether it existed
    pub fn remove_pending(&self, rel: &str) -> Result<bool> {
        let dir = self.pending_root.join(safe_relative_path(rel)?);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)?;
        info!(dir = %rel, "Removed pending ad");
        Ok(true)
    }

    /// Move every pending ad folder into the archived root
    ///
    /// **Algorithm** per pending folder with relative path `rel`:
    /// - archived `rel` missing: move the whole folder
    /// - archived `rel` present: move each file individually, renaming a
    ///   colliding file to `<stem>__<unix seconds><ext>`, then remove the
    ///   source folder (best-effort; subfolders are not merged and keep it
    ///   in place, see [`PromoteReport::leftover`])
    ///
    /// Collisions never raise and never overwrite.
    pub fn promote_all(&self) -> Result<PromoteReport> {
        let mut report = PromoteReport::default();

        let dirs: BTreeSet<PathBuf> = find_ad_files(&self.pending_root)?
            .into_iter()
            .filter_map(|f| f.parent().map(Path::to_path_buf))
            .collect();

        for dir in dirs {
            // A parent folder promoted earlier may have carried this one along
            if !dir.is_dir() {
                continue;
            }
            let rel = dir
                .strip_prefix(&self.pending_root)
                .map_err(|e| Error::Internal(e.to_string()))?
                .to_path_buf();
            let rel_name = to_slash_path(&rel);
            let dest = self.archive_root.join(&rel);

            if !dest.exists() {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                move_path(&dir, &dest)?;
                info!(dir = %rel_name, "Promoted ad folder");
                report.moved.push(rel_name);
                continue;
            }

            self.merge_into(&dir, &dest, &mut report)?;

            if let Err(e) = std::fs::remove_dir(&dir) {
                warn!(dir = %dir.display(), error = %e, "Could not remove merged ad folder");
                report.leftover.push(dir.clone());
            }
            info!(dir = %rel_name, "Merged ad folder into archive");
            report.merged.push(rel_name);
        }

        Ok(report)
    }

    fn merge_into(&self, src: &Path, dest: &Path, report: &mut PromoteReport) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp();

        for entry in std::fs::read_dir(src)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                debug!(dir = %path.display(), "Leaving subfolder in merged ad folder");
                continue;
            }
            let mut target = dest.join(entry.file_name());

            if target.exists() {
                target = collision_free_name(dest, &path, timestamp);
                debug!(
                    from = %path.display(),
                    to = %target.display(),
                    "Renaming colliding file during merge"
                );
                report.renamed.push(target.clone());
            }

            move_path(&path, &target)?;
        }
        Ok(())
    }
}

/// `<stem>__<timestamp><ext>` in `dest`, with a counter when even that is taken
fn collision_free_name(dest: &Path, incoming: &Path, timestamp: i64) -> PathBuf {
    let stem = incoming
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = incoming
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let candidate = dest.join(format!("{}__{}{}", stem, timestamp, ext));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1;
    loop {
        let candidate = dest.join(format!("{}__{}_{}{}", stem, timestamp, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn yaml_text(data: &serde_yaml::Value, key: &str) -> String {
    match data.get(key) {
        Some(serde_yaml::Value::String(s)) => s.clone(),
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
