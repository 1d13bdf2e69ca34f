use tempfile::tempdir;

use super::helpers::{row_fields, sample_schema_fields};
use crate::engine::{Engine, EngineConfig, EngineError};

#[test]
fn clean_resets_data_but_preserves_the_schema() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(dir.path(), Some(sample_schema_fields()), EngineConfig::default()).unwrap();

    let seq = engine.insert(row_fields(1, "a")).unwrap();
    engine.flush().unwrap();
    assert!(engine.get(seq).unwrap().is_some());

    engine.clean().unwrap();
    assert!(engine.get(seq).unwrap().is_none());

    // Schema survived: inserting a well-formed row still works, and its
    // seq starts again from zero.
    let new_seq = engine.insert(row_fields(2, "b")).unwrap();
    assert_eq!(new_seq, 0);
    assert!(engine.get(new_seq).unwrap().is_some());

    engine.close().unwrap();
}

#[test]
fn destroy_removes_the_root_directory_and_rejects_further_operations() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let engine = Engine::open(&root, Some(sample_schema_fields()), EngineConfig::default()).unwrap();
    engine.insert(row_fields(1, "a")).unwrap();

    engine.destroy().unwrap();
    assert!(!root.exists());

    let err = engine.insert(row_fields(2, "b")).unwrap_err();
    assert!(matches!(err, EngineError::Closed));
}
