//! Inbox Segmentation Tests
//! Test File: segmentation_tests.rs

mod helpers;

use helpers::{file_names, write_black_image, write_noise_image, NameClassifier};
use lista_app::services::inbox_segmenter::CURSOR_FILE;
use lista_app::services::{
    DetectError, InboxSegmenter, SegmentError, SeparatorClassifier, SeparatorDetector,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct Dirs {
    _temp_dir: TempDir,
    inbox: PathBuf,
    input: PathBuf,
}

fn dirs() -> Dirs {
    let temp_dir = TempDir::new().unwrap();
    let inbox = temp_dir.path().join("inbox");
    let input = temp_dir.path().join("input");
    fs::create_dir_all(&inbox).unwrap();
    fs::create_dir_all(&input).unwrap();
    Dirs {
        _temp_dir: temp_dir,
        inbox,
        input,
    }
}

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
}

fn name_segmenter(d: &Dirs) -> InboxSegmenter {
    InboxSegmenter::new(d.inbox.clone(), d.input.clone(), Arc::new(NameClassifier))
}

fn real_segmenter(d: &Dirs) -> InboxSegmenter {
    InboxSegmenter::new(d.inbox.clone(), d.input.clone(), Arc::new(SeparatorDetector::new()))
}

/// Name-based classifier that, once armed, turns the separator file into a
/// directory so deleting it fails mid-run
struct UndeletableSeparator {
    armed: AtomicBool,
}

impl SeparatorClassifier for UndeletableSeparator {
    fn is_separator(&self, path: &Path) -> Result<bool, DetectError> {
        let separator = NameClassifier.is_separator(path)?;
        if separator && self.armed.swap(false, Ordering::SeqCst) {
            fs::remove_file(path).unwrap();
            fs::create_dir(path).unwrap();
            fs::write(path.join("keep"), b"x").unwrap();
        }
        Ok(separator)
    }
}

#[test]
fn test_groups_split_at_separators() {
    let d = dirs();
    touch(
        &d.inbox,
        &["01.jpg", "02.jpg", "03_sep.jpg", "04.jpg", "05_sep.jpg", "06_sep.jpg", "07.jpg"],
    );

    let report = name_segmenter(&d).segment().unwrap();

    assert_eq!(report.items_created, vec!["01", "04", "07"]);
    assert_eq!(report.images_moved, 4);
    assert_eq!(report.separators_removed, 3);
    assert_eq!(report.resumed_item, None);

    assert_eq!(file_names(&d.input), vec!["01", "04", "07"]);
    assert_eq!(file_names(&d.input.join("01")), vec!["01.jpg", "02.jpg"]);
    assert_eq!(file_names(&d.input.join("04")), vec!["04.jpg"]);
    // Trailing group without a closing separator is still an item
    assert_eq!(file_names(&d.input.join("07")), vec!["07.jpg"]);

    // Every file consumed, cursor removed
    assert!(file_names(&d.inbox).is_empty());
}

#[test]
fn test_leading_and_adjacent_separators_create_no_folders() {
    let d = dirs();
    touch(&d.inbox, &["00_sep.jpg", "01_sep.jpg", "02.jpg", "03.jpg"]);

    let report = name_segmenter(&d).segment().unwrap();

    assert_eq!(report.items_created, vec!["02"]);
    assert_eq!(file_names(&d.input), vec!["02"]);
    assert_eq!(file_names(&d.input.join("02")), vec!["02.jpg", "03.jpg"]);
}

#[test]
fn test_non_images_stay_in_inbox() {
    let d = dirs();
    touch(&d.inbox, &["01.jpg", "readme.txt", "02.JPG"]);

    name_segmenter(&d).segment().unwrap();

    assert_eq!(file_names(&d.inbox), vec!["readme.txt"]);
    assert_eq!(file_names(&d.input.join("01")), vec!["01.jpg", "02.JPG"]);
}

#[test]
fn test_empty_inbox_is_noop() {
    let d = dirs();
    let report = name_segmenter(&d).segment().unwrap();
    assert!(report.items_created.is_empty());
    assert!(file_names(&d.input).is_empty());
}

#[test]
fn test_existing_item_folder_is_conflict() {
    let d = dirs();
    fs::create_dir_all(d.input.join("01")).unwrap();
    touch(&d.inbox, &["01.jpg", "02.jpg"]);

    let result = name_segmenter(&d).segment();

    match result {
        Err(SegmentError::ItemExists(path)) => assert_eq!(path, d.input.join("01")),
        other => panic!("expected ItemExists, got {:?}", other),
    }
    // Nothing moved
    assert_eq!(file_names(&d.inbox), vec!["01.jpg", "02.jpg"]);
}

#[test]
fn test_duplicate_stem_across_groups_is_conflict() {
    let d = dirs();
    // Byte order: a.jpg, a.jpg_sep.png, a.png
    touch(&d.inbox, &["a.jpg", "a.jpg_sep.png", "a.png"]);

    let result = name_segmenter(&d).segment();
    assert!(matches!(result, Err(SegmentError::ItemExists(_))));

    // First group completed before the collision
    assert_eq!(file_names(&d.input.join("a")), vec!["a.jpg"]);
    assert_eq!(file_names(&d.inbox), vec![CURSOR_FILE.to_string(), "a.png".to_string()]);
}

#[test]
fn test_resume_continues_open_item() {
    let d = dirs();
    fs::create_dir_all(d.input.join("01")).unwrap();
    touch(&d.input.join("01"), &["01.jpg"]);
    fs::write(d.inbox.join(CURSOR_FILE), r#"{"current_item":"01"}"#).unwrap();
    touch(&d.inbox, &["02.jpg", "03_sep.jpg", "04.jpg"]);

    let report = name_segmenter(&d).segment().unwrap();

    assert_eq!(report.resumed_item.as_deref(), Some("01"));
    assert_eq!(report.items_created, vec!["04"]);
    assert_eq!(file_names(&d.input.join("01")), vec!["01.jpg", "02.jpg"]);
    assert!(!d.inbox.join(CURSOR_FILE).exists());
}

#[test]
fn test_closed_cursor_starts_new_item() {
    let d = dirs();
    fs::write(d.inbox.join(CURSOR_FILE), r#"{"current_item":null}"#).unwrap();
    touch(&d.inbox, &["05.jpg"]);

    let report = name_segmenter(&d).segment().unwrap();
    assert_eq!(report.resumed_item, None);
    assert_eq!(report.items_created, vec!["05"]);
}

#[test]
fn test_real_detector_splits_on_black_frame() {
    let d = dirs();
    write_noise_image(&d.inbox.join("IMG_0001.png"), 128, 1);
    write_noise_image(&d.inbox.join("IMG_0002.png"), 128, 2);
    write_black_image(&d.inbox.join("IMG_0003.png"), 128);
    write_noise_image(&d.inbox.join("IMG_0004.png"), 128, 4);

    let report = real_segmenter(&d).segment().unwrap();

    assert_eq!(report.items_created, vec!["IMG_0001", "IMG_0004"]);
    assert_eq!(report.separators_removed, 1);
    assert_eq!(
        file_names(&d.input.join("IMG_0001")),
        vec!["IMG_0001.png", "IMG_0002.png"]
    );
    assert_eq!(file_names(&d.input.join("IMG_0004")), vec!["IMG_0004.png"]);
}

#[test]
fn test_undecodable_image_aborts_and_resumes() {
    let d = dirs();
    write_noise_image(&d.inbox.join("IMG_0001.png"), 64, 1);
    fs::write(d.inbox.join("IMG_0002.jpg"), b"definitely not a jpeg").unwrap();

    let result = real_segmenter(&d).segment();
    match result {
        Err(SegmentError::Classify { path, .. }) => assert_eq!(path, d.inbox.join("IMG_0002.jpg")),
        other => panic!("expected Classify error, got {:?}", other),
    }

    // Processed photo stays moved, broken file stays in the inbox, cursor kept
    assert_eq!(file_names(&d.input.join("IMG_0001")), vec!["IMG_0001.png"]);
    assert!(d.inbox.join("IMG_0002.jpg").exists());
    assert!(d.inbox.join(CURSOR_FILE).exists());

    // Operator replaces the broken file; the rerun keeps filling IMG_0001
    fs::remove_file(d.inbox.join("IMG_0002.jpg")).unwrap();
    write_noise_image(&d.inbox.join("IMG_0002.png"), 64, 2);

    let report = real_segmenter(&d).segment().unwrap();
    assert_eq!(report.resumed_item.as_deref(), Some("IMG_0001"));
    assert!(report.items_created.is_empty());
    assert_eq!(
        file_names(&d.input.join("IMG_0001")),
        vec!["IMG_0001.png", "IMG_0002.png"]
    );
}

#[test]
fn test_interrupted_separator_delete_does_not_merge_items() {
    let d = dirs();
    touch(&d.inbox, &["01.jpg", "02_sep.jpg", "03.jpg"]);
    let classifier = Arc::new(UndeletableSeparator {
        armed: AtomicBool::new(true),
    });
    let segmenter = InboxSegmenter::new(d.inbox.clone(), d.input.clone(), classifier);

    // Run stops while removing the separator
    assert!(matches!(segmenter.segment(), Err(SegmentError::Io(_))));
    assert_eq!(file_names(&d.input.join("01")), vec!["01.jpg"]);

    // Item already closed in the cursor
    let cursor = fs::read_to_string(d.inbox.join(CURSOR_FILE)).unwrap();
    assert_eq!(cursor, r#"{"current_item":null}"#);

    // Separator back in place; the rerun starts a new item for 03
    fs::remove_dir_all(d.inbox.join("02_sep.jpg")).unwrap();
    touch(&d.inbox, &["02_sep.jpg"]);
    let report = segmenter.segment().unwrap();

    assert_eq!(report.resumed_item, None);
    assert_eq!(report.items_created, vec!["03"]);
    assert_eq!(file_names(&d.input.join("01")), vec!["01.jpg"]);
    assert_eq!(file_names(&d.input.join("03")), vec!["03.jpg"]);
    assert!(file_names(&d.inbox).is_empty());
}
