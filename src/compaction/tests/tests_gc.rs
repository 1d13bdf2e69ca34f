use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use crate::compaction::gc::GarbageCollector;
use crate::manifest::edit::VersionEdit;
use crate::manifest::{FileMetadata, Version};
use crate::sstable::sst_file_name;

fn file_meta(number: u64) -> FileMetadata {
    FileMetadata { file_number: number, level: 0, size: 1, min_key: 0, max_key: 0, row_count: 1 }
}

#[test]
fn sweep_removes_orphaned_files_old_enough_but_keeps_live_ones() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(sst_file_name(1)), b"live").unwrap();
    fs::write(dir.path().join(sst_file_name(2)), b"orphan").unwrap();

    let version = Version::empty().apply(&VersionEdit::new().add_file(file_meta(1)));
    let gc = GarbageCollector::with_min_age(dir.path().to_path_buf(), Duration::ZERO);

    let swept = gc.sweep(&version).unwrap();
    assert_eq!(swept, 1);
    assert!(dir.path().join(sst_file_name(1)).exists());
    assert!(!dir.path().join(sst_file_name(2)).exists());
    assert_eq!(gc.orphans_swept(), 1);
    assert!(gc.last_sweep().is_some());
}

#[test]
fn sweep_leaves_orphans_younger_than_min_age() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(sst_file_name(1)), b"orphan").unwrap();

    let version = Version::empty();
    let gc = GarbageCollector::with_min_age(dir.path().to_path_buf(), Duration::from_secs(3600));

    let swept = gc.sweep(&version).unwrap();
    assert_eq!(swept, 0);
    assert!(dir.path().join(sst_file_name(1)).exists());
}

#[test]
fn sweep_ignores_non_sst_files_and_a_missing_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("CURRENT"), b"MANIFEST-000001").unwrap();

    let version = Version::empty();
    let gc = GarbageCollector::with_min_age(dir.path().to_path_buf(), Duration::ZERO);
    assert_eq!(gc.sweep(&version).unwrap(), 0);
    assert!(dir.path().join("CURRENT").exists());

    let missing = GarbageCollector::with_min_age(dir.path().join("does-not-exist"), Duration::ZERO);
    assert_eq!(missing.sweep(&version).unwrap(), 0);
}
