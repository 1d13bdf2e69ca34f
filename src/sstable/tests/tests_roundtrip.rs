use std::collections::BTreeMap;

use tempfile::tempdir;

use crate::schema::{FieldDef, FieldType, FieldValue, Row, Schema};
use crate::sstable::writer::EncodedRow;
use crate::sstable::{SstReader, SstWriter};

fn sample_schema() -> Schema {
    Schema::new(vec![
        FieldDef { name: "device".into(), field_type: FieldType::String, nullable: false },
        FieldDef { name: "value".into(), field_type: FieldType::F64, nullable: false },
    ])
}

fn sample_row(schema: &Schema, seq: i64, time: i64, device: &str, value: f64) -> EncodedRow {
    let mut fields = BTreeMap::new();
    fields.insert("device".to_string(), FieldValue::String(device.to_string()));
    fields.insert("value".to_string(), FieldValue::F64(value));
    let row = Row { seq, time, fields };
    EncodedRow { seq, time, bytes: schema.encode_row(&row).unwrap() }
}

#[test]
fn build_then_read_round_trips_every_row() {
    let schema = sample_schema();
    let rows: Vec<EncodedRow> = (0..500)
        .map(|i| sample_row(&schema, i, 1_000 + i, "sensor-a", i as f64))
        .collect();

    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.sst");
    let summary = SstWriter::new(&path).build(&rows).unwrap();
    assert_eq!(summary.row_count, 500);
    assert_eq!(summary.min_key, 0);
    assert_eq!(summary.max_key, 499);

    let reader = SstReader::open(&path, 1).unwrap();
    assert_eq!(reader.row_count(), 500);
    assert_eq!(reader.get_all_keys().unwrap(), (0..500).collect::<Vec<_>>());

    let row = reader.get(&schema, 250).unwrap().unwrap();
    assert_eq!(row.seq, 250);
    assert_eq!(row.fields.get("value"), Some(&FieldValue::F64(250.0)));

    assert!(reader.get(&schema, 9999).unwrap().is_none());
}

#[test]
fn get_partial_decodes_only_requested_fields() {
    let schema = sample_schema();
    let rows = vec![sample_row(&schema, 1, 10, "sensor-b", 3.25)];

    let dir = tempdir().unwrap();
    let path = dir.path().join("000002.sst");
    SstWriter::new(&path).build(&rows).unwrap();

    let reader = SstReader::open(&path, 2).unwrap();
    let fields = vec!["value".to_string()];
    let row = reader.get_partial(&schema, 1, &fields).unwrap().unwrap();
    assert_eq!(row.fields.len(), 1);
    assert_eq!(row.fields.get("value"), Some(&FieldValue::F64(3.25)));
}

#[test]
fn read_all_returns_rows_in_ascending_seq_order() {
    let schema = sample_schema();
    let rows: Vec<EncodedRow> = (0..50).map(|i| sample_row(&schema, i, i, "s", i as f64)).collect();

    let dir = tempdir().unwrap();
    let path = dir.path().join("000003.sst");
    SstWriter::new(&path).build(&rows).unwrap();

    let reader = SstReader::open(&path, 3).unwrap();
    let decoded = reader.read_all(&schema).unwrap();
    let seqs: Vec<i64> = decoded.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, (0..50).collect::<Vec<_>>());
}

#[test]
fn building_with_zero_rows_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.sst");
    let rows: Vec<EncodedRow> = Vec::new();
    assert!(SstWriter::new(&path).build(&rows).is_err());
}
