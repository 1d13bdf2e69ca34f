//! WalManager rotation, deletion and directory-wide recovery.

use crate::wal::{WalManager, WalRecord};
use tempfile::tempdir;

#[test]
fn rotate_advances_epoch_and_current_pointer() {
    let dir = tempdir().unwrap();
    let manager = WalManager::open(dir.path()).unwrap();
    assert_eq!(manager.current().number(), 0);

    manager.current().append(&WalRecord::put(1, b"a".to_vec())).unwrap();
    let retired = manager.rotate().unwrap();
    assert_eq!(retired, 0);
    assert_eq!(manager.current().number(), 1);

    manager.current().append(&WalRecord::put(2, b"b".to_vec())).unwrap();

    let current_pointer = std::fs::read_to_string(dir.path().join("CURRENT")).unwrap();
    assert_eq!(current_pointer.trim(), "1");
}

#[test]
fn reopen_resumes_at_persisted_current_epoch() {
    let dir = tempdir().unwrap();
    {
        let manager = WalManager::open(dir.path()).unwrap();
        manager.rotate().unwrap();
        manager.rotate().unwrap();
    }
    let manager = WalManager::open(dir.path()).unwrap();
    assert_eq!(manager.current().number(), 2);
}

#[test]
fn delete_removes_retired_wal_file() {
    let dir = tempdir().unwrap();
    let manager = WalManager::open(dir.path()).unwrap();
    manager.current().append(&WalRecord::put(1, b"x".to_vec())).unwrap();
    let retired = manager.rotate().unwrap();

    manager.delete(retired).unwrap();
    let recovered = manager.recover_all().unwrap();
    assert!(recovered.is_empty());

    // deleting an already-absent epoch is a no-op, not an error
    manager.delete(retired).unwrap();
}

#[test]
fn recover_all_concatenates_epochs_in_ascending_order() {
    let dir = tempdir().unwrap();
    let manager = WalManager::open(dir.path()).unwrap();

    manager.current().append(&WalRecord::put(1, b"epoch0".to_vec())).unwrap();
    manager.rotate().unwrap();
    manager.current().append(&WalRecord::put(2, b"epoch1".to_vec())).unwrap();
    manager.rotate().unwrap();
    manager.current().append(&WalRecord::put(3, b"epoch2".to_vec())).unwrap();

    let recovered = manager.recover_all().unwrap();
    let seqs: Vec<i64> = recovered.iter().map(|(_, r)| r.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(recovered[0].0, 0);
    assert_eq!(recovered[1].0, 1);
    assert_eq!(recovered[2].0, 2);
}
