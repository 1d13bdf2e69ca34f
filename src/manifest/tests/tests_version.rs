use crate::manifest::edit::VersionEdit;
use crate::manifest::version::{FileMetadata, Version};

fn file(file_number: u64, level: u32, min_key: i64, max_key: i64) -> FileMetadata {
    FileMetadata { file_number, level, size: 1024, min_key, max_key, row_count: (max_key - min_key + 1) as u64 }
}

#[test]
fn apply_add_places_file_at_its_level() {
    let v = Version::empty();
    let edit = VersionEdit::new().add_file(file(1, 0, 0, 9));
    let v2 = v.apply(&edit);

    assert_eq!(v2.files_at(0).len(), 1);
    assert!(v2.files_at(1).is_empty());
    assert_eq!(v2.max_seq(), 9);
}

#[test]
fn apply_is_idempotent_for_duplicate_adds() {
    let v = Version::empty().apply(&VersionEdit::new().add_file(file(1, 0, 0, 9)));
    let v2 = v.apply(&VersionEdit::new().add_file(file(1, 0, 0, 9)));
    assert_eq!(v2.files_at(0).len(), 1);
}

#[test]
fn apply_delete_removes_file_from_any_level() {
    let v = Version::empty().apply(&VersionEdit::new().add_file(file(1, 0, 0, 9)).add_file(file(2, 1, 10, 19)));
    let v2 = v.apply(&VersionEdit::new().delete_file(1));

    assert!(v2.files_at(0).is_empty());
    assert_eq!(v2.files_at(1).len(), 1);
}

#[test]
fn old_version_is_unaffected_by_later_apply() {
    let v1 = Version::empty().apply(&VersionEdit::new().add_file(file(1, 0, 0, 9)));
    let v2 = v1.apply(&VersionEdit::new().delete_file(1).add_file(file(2, 0, 10, 19)));

    assert_eq!(v1.files_at(0).len(), 1);
    assert_eq!(v2.files_at(0).len(), 1);
    assert_eq!(v1.files_at(0)[0].file_number, 1);
    assert_eq!(v2.files_at(0)[0].file_number, 2);
}

#[test]
fn empty_version_has_no_max_seq() {
    assert_eq!(Version::empty().max_seq(), -1);
    assert!(Version::empty().is_empty());
}

#[test]
fn level_size_sums_only_that_level() {
    let v = Version::empty().apply(&VersionEdit::new().add_file(file(1, 0, 0, 9)).add_file(file(2, 0, 10, 19)).add_file(file(3, 1, 20, 29)));
    assert_eq!(v.level_size(0), 2048);
    assert_eq!(v.level_size(1), 1024);
}
