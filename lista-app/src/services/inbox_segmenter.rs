//! Inbox segmentation
//!
//! Splits the flat stream of photographed images in the inbox into per-item
//! folders below the input root. Grouping depends only on separator
//! positions in filename order: every separator frame closes the current
//! item and the next photo opens a new one.
//!
//! **Resumability:** while a run is in progress a cursor file in the inbox
//! records the item folder currently receiving photos. A run interrupted
//! midway (crash, classifier failure) leaves the cursor behind, and the next
//! run continues filling that folder instead of opening a new item for the
//! remaining photos. The cursor is removed once a run completes.

use crate::models::item::is_image_path;
use crate::services::separator_detector::{DetectError, SeparatorClassifier};
use lista_common::fs_utils::move_path;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cursor file kept in the inbox during a run
pub const CURSOR_FILE: &str = ".segmenting.json";

/// Segmentation errors
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Inbox directory missing or not a directory
    #[error("Inbox not found: {0}")]
    InboxNotFound(PathBuf),

    /// Two groups would produce the same item folder; rename in the inbox
    #[error("Item directory already exists: {0}")]
    ItemExists(PathBuf),

    /// Classifier could not read an image; the run is aborted
    #[error("Failed to classify {path}: {source}")]
    Classify {
        path: PathBuf,
        #[source]
        source: DetectError,
    },

    /// Cursor file left by an earlier run is unreadable
    #[error("Invalid segmentation cursor {path}: {reason}")]
    InvalidCursor { path: PathBuf, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Move failure
    #[error(transparent)]
    Common(#[from] lista_common::Error),
}

/// Result of one segmentation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    /// Item folders created, in creation order
    pub items_created: Vec<String>,
    /// Item folder continued from an interrupted run
    pub resumed_item: Option<String>,
    /// Photos moved into item folders
    pub images_moved: usize,
    /// Separator frames deleted
    pub separators_removed: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Cursor {
    current_item: Option<String>,
}

/// Inbox segmenter
pub struct InboxSegmenter {
    inbox_dir: PathBuf,
    input_dir: PathBuf,
    classifier: Arc<dyn SeparatorClassifier>,
}

impl InboxSegmenter {
    pub fn new(
        inbox_dir: PathBuf,
        input_dir: PathBuf,
        classifier: Arc<dyn SeparatorClassifier>,
    ) -> Self {
        Self {
            inbox_dir,
            input_dir,
            classifier,
        }
    }

    /// Image files in the inbox, sorted by file name (byte order)
    pub fn pending_images(&self) -> Result<Vec<PathBuf>, SegmentError> {
        if !self.inbox_dir.is_dir() {
            return Err(SegmentError::InboxNotFound(self.inbox_dir.clone()));
        }

        let mut names: Vec<OsString> = Vec::new();
        for entry in std::fs::read_dir(&self.inbox_dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && is_image_path(&path) {
                names.push(entry.file_name());
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| self.inbox_dir.join(name))
            .collect())
    }

    /// Process the inbox once
    ///
    /// **Algorithm:**
    /// 1. List inbox images sorted by file name
    /// 2. Classify each image in order
    /// 3. Separator: delete it and close the current item
    /// 4. Photo: open a new item folder named after its stem if none is
    ///    open, then move it into the open folder
    ///
    /// Item folders are created only once a photo needs them, so leading or
    /// adjacent separators never leave empty folders behind. A trailing run
    /// of photos without a closing separator still forms an item.
    ///
    /// # Errors
    ///
    /// Aborts on the first classifier failure or item folder collision;
    /// files already processed stay where they were moved.
    pub fn segment(&self) -> Result<SegmentReport, SegmentError> {
        let images = self.pending_images()?;
        let mut report = SegmentReport::default();

        let mut current: Option<PathBuf> = match self.read_cursor()? {
            Some(name) => {
                let dir = self.input_dir.join(&name);
                if dir.is_dir() {
                    info!(item = %name, "Resuming interrupted segmentation");
                    report.resumed_item = Some(name);
                    Some(dir)
                } else {
                    warn!(item = %name, "Cursor names a missing item folder, starting fresh");
                    None
                }
            }
            None => None,
        };

        info!(
            inbox = %self.inbox_dir.display(),
            images = images.len(),
            "Processing inbox"
        );

        for path in images {
            let is_separator = self
                .classifier
                .is_separator(&path)
                .map_err(|source| SegmentError::Classify {
                    path: path.clone(),
                    source,
                })?;

            if is_separator {
                // Cursor closes first: an interruption before the delete
                // leaves the separator in the inbox for the next run
                if current.take().is_some() {
                    self.write_cursor(None)?;
                }
                std::fs::remove_file(&path)?;
                report.separators_removed += 1;
                debug!(path = %path.display(), "Removed separator frame");
                continue;
            }

            let target_dir = match &current {
                Some(dir) => dir.clone(),
                None => {
                    let (name, dir) = self.create_item_dir(&path)?;
                    self.write_cursor(Some(&name))?;
                    report.items_created.push(name);
                    current = Some(dir.clone());
                    dir
                }
            };

            let file_name = path
                .file_name()
                .ok_or_else(|| lista_common::Error::InvalidInput(path.display().to_string()))?;
            let destination = target_dir.join(file_name);
            if destination.exists() {
                return Err(SegmentError::Io(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} already exists", destination.display()),
                )));
            }
            move_path(&path, &destination)?;
            report.images_moved += 1;
        }

        self.clear_cursor()?;

        info!(
            items = report.items_created.len(),
            images = report.images_moved,
            separators = report.separators_removed,
            "Inbox processed"
        );
        Ok(report)
    }

    /// Create the item folder named after the first photo's stem
    fn create_item_dir(&self, first_image: &Path) -> Result<(String, PathBuf), SegmentError> {
        let name = first_image
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                lista_common::Error::InvalidInput(format!(
                    "Cannot derive item name from {}",
                    first_image.display()
                ))
            })?;

        let dir = self.input_dir.join(&name);
        match std::fs::create_dir(&dir) {
            Ok(()) => {
                info!(item = %name, "Created item folder");
                Ok((name, dir))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(SegmentError::ItemExists(dir)),
            Err(e) => Err(SegmentError::Io(e)),
        }
    }

    fn cursor_path(&self) -> PathBuf {
        self.inbox_dir.join(CURSOR_FILE)
    }

    fn read_cursor(&self) -> Result<Option<String>, SegmentError> {
        let path = self.cursor_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SegmentError::Io(e)),
        };
        let cursor: Cursor =
            serde_json::from_str(&content).map_err(|e| SegmentError::InvalidCursor {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(cursor.current_item)
    }

    /// Write the cursor atomically (temp file + rename)
    fn write_cursor(&self, current_item: Option<&str>) -> Result<(), SegmentError> {
        let cursor = Cursor {
            current_item: current_item.map(str::to_string),
        };
        let json = serde_json::to_string(&cursor).map_err(|e| {
            lista_common::Error::Internal(format!("Failed to encode cursor: {}", e))
        })?;
        let path = self.cursor_path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear_cursor(&self) -> Result<(), SegmentError> {
        match std::fs::remove_file(self.cursor_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SegmentError::Io(e)),
        }
    }
}
