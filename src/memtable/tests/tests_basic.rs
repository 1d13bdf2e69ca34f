use crate::memtable::{MemTable, MemTableError};
use crate::wal::Wal;
use std::sync::Arc;
use tempfile::tempdir;

fn open_table(dir: &std::path::Path, buffer: usize) -> Arc<MemTable> {
    let wal = Arc::new(Wal::open(dir, 0).unwrap());
    Arc::new(MemTable::new(wal, buffer))
}

#[test]
fn put_then_get_round_trips() {
    let dir = tempdir().unwrap();
    let table = open_table(dir.path(), 4096);

    table.put(1, b"row-a".to_vec()).unwrap();
    table.put(2, b"row-b".to_vec()).unwrap();

    assert_eq!(table.get(1).unwrap(), Some(b"row-a".to_vec()));
    assert_eq!(table.get(2).unwrap(), Some(b"row-b".to_vec()));
    assert_eq!(table.get(3).unwrap(), None);
}

#[test]
fn keys_are_sorted_ascending() {
    let dir = tempdir().unwrap();
    let table = open_table(dir.path(), 4096);

    table.put(5, b"x".to_vec()).unwrap();
    table.put(1, b"y".to_vec()).unwrap();
    table.put(3, b"z".to_vec()).unwrap();

    assert_eq!(table.keys().unwrap(), vec![1, 3, 5]);
}

#[test]
fn exceeding_write_buffer_returns_flush_required() {
    let dir = tempdir().unwrap();
    let table = open_table(dir.path(), 16);

    table.put(1, b"abcdefgh".to_vec()).unwrap();
    let err = table.put(2, b"abcdefgh".to_vec()).unwrap_err();
    assert!(matches!(err, MemTableError::FlushRequired));
}

#[test]
fn recover_rebuilds_state_from_wal() {
    let dir = tempdir().unwrap();
    {
        let table = open_table(dir.path(), 4096);
        table.put(1, b"a".to_vec()).unwrap();
        table.put(2, b"b".to_vec()).unwrap();
    }

    let wal = Arc::new(Wal::open(dir.path(), 0).unwrap());
    let (recovered, max_seq) = MemTable::recover(wal, 4096).unwrap();
    assert_eq!(max_seq, Some(2));
    assert_eq!(recovered.get(1).unwrap(), Some(b"a".to_vec()));
    assert_eq!(recovered.get(2).unwrap(), Some(b"b".to_vec()));
}
