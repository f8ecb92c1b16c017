//! Item repository
//!
//! Snapshot of the item folders below the input root. Item ids are indices
//! into the last snapshot, so they stay stable until the next `refresh()`.

use crate::models::item::is_image_path;
use crate::models::Item;
use lista_common::fs_utils::to_slash_path;
use lista_common::Result;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Item folder snapshot with explicit refresh
#[derive(Debug)]
pub struct ItemRepository {
    input_root: PathBuf,
    items: RwLock<Vec<Item>>,
}

impl ItemRepository {
    /// Create an empty repository; call [`refresh`](Self::refresh) to populate
    pub fn new(input_root: PathBuf) -> Self {
        Self {
            input_root,
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    /// Rescan the input root and replace the snapshot
    pub async fn refresh(&self) -> Result<Vec<Item>> {
        let items = scan_items(&self.input_root)?;
        debug!(count = items.len(), "Refreshed item snapshot");
        *self.items.write().await = items.clone();
        Ok(items)
    }

    /// Item by id from the last snapshot
    pub async fn get(&self, id: usize) -> Option<Item> {
        self.items.read().await.get(id).cloned()
    }

    /// Number of items in the last snapshot
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Images directly inside an item folder
    ///
    /// Paths are relative to the input root, `/`-separated and sorted.
    pub fn images(&self, item: &Item) -> Result<Vec<String>> {
        let mut images = Vec::new();
        for entry in std::fs::read_dir(&item.abs_path)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || !is_image_path(&path) {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&self.input_root) {
                images.push(to_slash_path(rel));
            }
        }
        images.sort();
        Ok(images)
    }
}

/// Immediate subdirectories of `input_root`, sorted case-insensitively
///
/// Creates `input_root` if it is missing.
pub fn scan_items(input_root: &Path) -> Result<Vec<Item>> {
    std::fs::create_dir_all(input_root)?;

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(input_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
    }
    dirs.sort_by_key(|(name, _)| name.to_lowercase());

    Ok(dirs
        .into_iter()
        .enumerate()
        .map(|(id, (name, abs_path))| Item {
            id,
            rel_path: name.clone(),
            name,
            abs_path,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_refresh_sorts_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("input");
        for name in ["b_lamp", "A_chair", "c_table"] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("stray.jpg"), b"x").unwrap();

        let repo = ItemRepository::new(root.clone());
        assert!(repo.is_empty().await);

        let items = repo.refresh().await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A_chair", "b_lamp", "c_table"]);
        assert_eq!(items[1].id, 1);
        assert_eq!(items[1].rel_path, "b_lamp");
        assert_eq!(repo.get(2).await.unwrap().name, "c_table");
        assert!(repo.get(3).await.is_none());
    }

    #[tokio::test]
    async fn test_images_filtered_and_relative() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("input");
        let item_dir = root.join("IMG_0001");
        std::fs::create_dir_all(item_dir.join("nested")).unwrap();
        for f in ["IMG_0003.JPG", "IMG_0001.jpg", "notes.txt"] {
            std::fs::write(item_dir.join(f), b"x").unwrap();
        }

        let repo = ItemRepository::new(root);
        repo.refresh().await.unwrap();
        let item = repo.get(0).await.unwrap();
        assert_eq!(
            repo.images(&item).unwrap(),
            vec!["IMG_0001/IMG_0001.jpg", "IMG_0001/IMG_0003.JPG"]
        );
    }

    #[test]
    fn test_scan_creates_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("input");
        assert!(scan_items(&root).unwrap().is_empty());
        assert!(root.is_dir());
    }
}
