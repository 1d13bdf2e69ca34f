use crate::wal::{Wal, WalRecord};
use tempfile::tempdir;

#[test]
fn append_and_replay_round_trip() {
    let dir = tempdir().unwrap();
    let wal = Wal::open(dir.path(), 0).unwrap();

    wal.append(&WalRecord::put(1, b"row-one".to_vec())).unwrap();
    wal.append(&WalRecord::put(2, b"row-two".to_vec())).unwrap();
    wal.append(&WalRecord::put(3, Vec::new())).unwrap();

    let records: Vec<_> = wal.iter().unwrap().collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].seq, 1);
    assert_eq!(records[0].payload, b"row-one");
    assert_eq!(records[1].seq, 2);
    assert_eq!(records[2].payload, Vec::<u8>::new());
}

#[test]
fn empty_wal_replays_nothing() {
    let dir = tempdir().unwrap();
    let wal = Wal::open(dir.path(), 0).unwrap();
    assert_eq!(wal.iter().unwrap().count(), 0);
}

#[test]
fn reopen_existing_file_preserves_records() {
    let dir = tempdir().unwrap();
    {
        let wal = Wal::open(dir.path(), 7).unwrap();
        wal.append(&WalRecord::put(100, b"payload".to_vec())).unwrap();
    }
    let reopened = Wal::open(dir.path(), 7).unwrap();
    let records: Vec<_> = reopened.iter().unwrap().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].seq, 100);
}

#[test]
fn truncate_clears_file() {
    let dir = tempdir().unwrap();
    let wal = Wal::open(dir.path(), 0).unwrap();
    wal.append(&WalRecord::put(1, b"x".to_vec())).unwrap();
    wal.truncate().unwrap();
    assert_eq!(wal.iter().unwrap().count(), 0);
}
