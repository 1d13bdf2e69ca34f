use crate::memtable::MemTableManager;
use tempfile::tempdir;

#[test]
fn switch_freezes_active_and_starts_fresh_one() {
    let dir = tempdir().unwrap();
    let (manager, max_seq) = MemTableManager::open(dir.path(), 4096).unwrap();
    assert_eq!(max_seq, None);

    manager.put(1, b"a".to_vec()).unwrap();
    manager.put(2, b"b".to_vec()).unwrap();

    let (retired_epoch, handle) = manager.switch().unwrap();
    assert_eq!(retired_epoch, 0);

    // frozen table still answers reads
    assert_eq!(handle.table.get(1).unwrap(), Some(b"a".to_vec()));

    manager.put(3, b"c".to_vec()).unwrap();
    // manager resolves through active first, then immutables
    assert_eq!(manager.get(3).unwrap(), Some(b"c".to_vec()));
    assert_eq!(manager.get(1).unwrap(), Some(b"a".to_vec()));

    manager.remove_immutable(&handle).unwrap();
    assert!(manager.immutables().unwrap().is_empty());
}

#[test]
fn reopen_after_switch_reconstructs_active_and_immutables() {
    let dir = tempdir().unwrap();
    {
        let (manager, _) = MemTableManager::open(dir.path(), 4096).unwrap();
        manager.put(1, b"a".to_vec()).unwrap();
        manager.switch().unwrap();
        manager.put(2, b"b".to_vec()).unwrap();
    }

    let (manager, max_seq) = MemTableManager::open(dir.path(), 4096).unwrap();
    assert_eq!(max_seq, Some(2));
    assert_eq!(manager.get(1).unwrap(), Some(b"a".to_vec()));
    assert_eq!(manager.get(2).unwrap(), Some(b"b".to_vec()));
    assert_eq!(manager.immutables().unwrap().len(), 1);
}
