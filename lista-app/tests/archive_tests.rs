//! Input Archive Tests
//! Test File: archive_tests.rs

mod helpers;

use helpers::file_names;
use lista_app::models::Item;
use lista_app::services::{ArchiveOutcome, InputArchive};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

struct Env {
    _temp_dir: TempDir,
    input: PathBuf,
    archive_root: PathBuf,
    archive: InputArchive,
}

fn env() -> Env {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input");
    let archive_root = temp_dir.path().join("input_archive");
    fs::create_dir_all(&input).unwrap();
    fs::create_dir_all(&archive_root).unwrap();
    let archive = InputArchive::new(input.clone(), archive_root.clone());
    Env {
        _temp_dir: temp_dir,
        input,
        archive_root,
        archive,
    }
}

fn item(input: &Path, name: &str) -> Item {
    Item {
        id: 0,
        name: name.to_string(),
        rel_path: name.to_string(),
        abs_path: input.join(name),
    }
}

fn make_item(input: &Path, name: &str, files: &[(&str, &[u8])]) -> Item {
    let dir = input.join(name);
    fs::create_dir_all(&dir).unwrap();
    for (file, content) in files {
        fs::write(dir.join(file), content).unwrap();
    }
    item(input, name)
}

fn set_mtime(dir: &Path, secs_ago: u64) {
    let when = SystemTime::now() - Duration::from_secs(secs_ago);
    File::open(dir).unwrap().set_modified(when).unwrap();
}

#[test]
fn test_archive_moves_folder() {
    let e = env();
    let chair = make_item(&e.input, "chair", &[("a.jpg", b"a")]);

    let outcome = e.archive.archive(&chair).unwrap();

    assert_eq!(outcome, ArchiveOutcome::Archived(e.archive_root.join("chair")));
    assert!(!e.input.join("chair").exists());
    assert_eq!(file_names(&e.archive_root.join("chair")), vec!["a.jpg"]);
}

#[test]
fn test_archive_never_overwrites() {
    let e = env();

    make_item(&e.input, "chair", &[("gen0.jpg", b"0")]);
    e.archive.archive(&item(&e.input, "chair")).unwrap();
    make_item(&e.input, "chair", &[("gen1.jpg", b"1")]);
    let second = e.archive.archive(&item(&e.input, "chair")).unwrap();
    make_item(&e.input, "chair", &[("gen2.jpg", b"2")]);
    let third = e.archive.archive(&item(&e.input, "chair")).unwrap();

    assert_eq!(second, ArchiveOutcome::Archived(e.archive_root.join("chair__1")));
    assert_eq!(third, ArchiveOutcome::Archived(e.archive_root.join("chair__2")));
    assert_eq!(file_names(&e.archive_root), vec!["chair", "chair__1", "chair__2"]);
    assert_eq!(file_names(&e.archive_root.join("chair")), vec!["gen0.jpg"]);
    assert_eq!(file_names(&e.archive_root.join("chair__2")), vec!["gen2.jpg"]);
}

#[test]
fn test_archive_missing_source_is_already_gone() {
    let e = env();
    let outcome = e.archive.archive(&item(&e.input, "ghost")).unwrap();
    assert_eq!(outcome, ArchiveOutcome::AlreadyGone);
    assert!(!outcome.is_archived());
    assert!(file_names(&e.archive_root).is_empty());
}

#[test]
fn test_archive_then_restore_round_trip() {
    let e = env();
    let lamp = make_item(
        &e.input,
        "lamp",
        &[("IMG_0001.jpg", b"first photo"), ("IMG_0002.jpg", b"second photo")],
    );
    fs::create_dir_all(e.input.join("lamp/notes")).unwrap();
    fs::write(e.input.join("lamp/notes/memo.txt"), b"brass").unwrap();

    e.archive.archive(&lamp).unwrap();
    assert!(!e.input.join("lamp").exists());

    assert!(e.archive.restore("lamp").unwrap());

    assert_eq!(
        file_names(&e.input.join("lamp")),
        vec!["IMG_0001.jpg", "IMG_0002.jpg", "notes"]
    );
    assert_eq!(fs::read(e.input.join("lamp/IMG_0001.jpg")).unwrap(), b"first photo");
    assert_eq!(fs::read(e.input.join("lamp/notes/memo.txt")).unwrap(), b"brass");
    assert!(file_names(&e.archive_root).is_empty());
}

#[test]
fn test_restore_picks_most_recent_generation() {
    let e = env();
    for (name, marker, age) in [("chair", "oldest", 300), ("chair__1", "newest", 10), ("chair__2", "middle", 100)] {
        let dir = e.archive_root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("marker.txt"), marker).unwrap();
        set_mtime(&dir, age);
    }

    assert!(e.archive.restore("chair").unwrap());

    assert_eq!(fs::read_to_string(e.input.join("chair/marker.txt")).unwrap(), "newest");
    assert_eq!(file_names(&e.archive_root), vec!["chair", "chair__2"]);
}

#[test]
fn test_restore_into_occupied_location_uses_undo_suffix() {
    let e = env();
    make_item(&e.archive_root, "chair", &[("archived.jpg", b"old")]);
    make_item(&e.input, "chair", &[("current.jpg", b"new")]);
    make_item(&e.input, "chair__undo1", &[]);

    assert!(e.archive.restore("chair").unwrap());

    assert_eq!(file_names(&e.input), vec!["chair", "chair__undo1", "chair__undo2"]);
    assert_eq!(file_names(&e.input.join("chair")), vec!["current.jpg"]);
    assert_eq!(file_names(&e.input.join("chair__undo2")), vec!["archived.jpg"]);
}

#[test]
fn test_restore_nested_relative_path() {
    let e = env();
    let nested = Item {
        id: 0,
        name: "desk".to_string(),
        rel_path: "office/desk".to_string(),
        abs_path: e.input.join("office/desk"),
    };
    fs::create_dir_all(&nested.abs_path).unwrap();
    fs::write(nested.abs_path.join("a.jpg"), b"a").unwrap();

    assert!(e.archive.archive(&nested).unwrap().is_archived());
    assert!(e.archive_root.join("office/desk/a.jpg").exists());

    assert!(e.archive.restore("office/desk").unwrap());
    assert!(e.input.join("office/desk/a.jpg").exists());
}

#[test]
fn test_restore_with_nothing_archived() {
    let e = env();
    assert!(!e.archive.restore("chair").unwrap());
    assert!(!e.archive.restore("office/desk").unwrap());
    assert!(file_names(&e.input).is_empty());
}
