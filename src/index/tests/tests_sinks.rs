use crate::index::{IndexSink, MemoryIndexSink, NullIndexSink};
use crate::schema::FieldValue;

#[test]
fn null_sink_accepts_everything_and_tracks_nothing() {
    let sink = NullIndexSink;
    sink.add(&FieldValue::String("a".into()), 1).unwrap();
    sink.persist().unwrap();
    sink.recover().unwrap();
}

#[test]
fn memory_sink_groups_seqs_by_value() {
    let sink = MemoryIndexSink::new();
    sink.add(&FieldValue::String("device-a".into()), 1).unwrap();
    sink.add(&FieldValue::String("device-a".into()), 2).unwrap();
    sink.add(&FieldValue::String("device-b".into()), 3).unwrap();

    assert_eq!(sink.seqs_for(&FieldValue::String("device-a".into())), vec![1, 2]);
    assert_eq!(sink.seqs_for(&FieldValue::String("device-b".into())), vec![3]);
    assert!(sink.seqs_for(&FieldValue::String("device-c".into())).is_empty());
    assert_eq!(sink.len(), 3);
}

#[test]
fn memory_sink_starts_empty() {
    let sink = MemoryIndexSink::new();
    assert!(sink.is_empty());
}
