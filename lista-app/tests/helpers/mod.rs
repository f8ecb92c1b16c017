//! Test Helper Utilities
//!
//! Shared utilities for testing lista-app

#![allow(dead_code)]

pub mod image_generator;
pub mod stubs;

// Re-export commonly used items
pub use image_generator::{write_black_image, write_noise_image, write_photo_like_image};
pub use stubs::{CopyAudio, NameClassifier, StubDrafter, StubPublisher};

use lista_app::{AppState, Collaborators};
use lista_common::config::WorkPaths;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary working tree plus state wired with stub collaborators
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub paths: WorkPaths,
    pub publisher: Arc<StubPublisher>,
    pub state: AppState,
}

impl TestEnv {
    /// Working tree with a publisher that exits with `publish_exit_code`
    pub fn new(publish_exit_code: i32) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let paths = WorkPaths::new(&temp_dir.path().join(".work"), &temp_dir.path().join("inbox"));
        paths.ensure_exists().unwrap();

        let publisher = Arc::new(StubPublisher::new(publish_exit_code));
        let state = AppState::new(
            paths.clone(),
            true,
            Collaborators {
                classifier: Arc::new(NameClassifier),
                drafter: Arc::new(StubDrafter),
                audio: Arc::new(CopyAudio),
                publisher: publisher.clone(),
            },
        );

        Self {
            temp_dir,
            paths,
            publisher,
            state,
        }
    }

    /// Create an item folder with the given image files (tiny valid PNGs)
    pub fn add_item(&self, name: &str, images: &[&str]) {
        let dir = self.paths.input_dir.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for image in images {
            write_photo_like_image(&dir.join(image), 32, 24);
        }
    }
}

/// Sorted file names directly inside `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
