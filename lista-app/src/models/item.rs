//! Item model
//!
//! An item is one product to be listed, represented as a directory of its
//! photos below the input root.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Lower-case extensions recognised as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif"];

/// Item folder below the input root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Position in the last repository snapshot
    pub id: usize,
    /// Directory name
    pub name: String,
    /// Path relative to the input root, `/`-separated
    pub rel_path: String,
    /// Absolute directory path
    #[serde(skip)]
    pub abs_path: PathBuf,
}

/// Whether a path carries a recognised image extension (case-insensitive)
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
