use crate::schema::{FieldDef, FieldType, Schema};
use tempfile::tempdir;

fn sample() -> Schema {
    Schema::new(vec![
        FieldDef { name: "device".into(), field_type: FieldType::String, nullable: false },
        FieldDef { name: "value".into(), field_type: FieldType::F64, nullable: false },
    ])
}

#[test]
fn persist_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let schema = sample();
    schema.persist(dir.path()).unwrap();

    let loaded = Schema::load(dir.path()).unwrap();
    assert_eq!(loaded.checksum(), schema.checksum());
    assert_eq!(loaded.fields().len(), 2);
}

#[test]
fn truncated_descriptor_is_detected() {
    let dir = tempdir().unwrap();
    sample().persist(dir.path()).unwrap();

    let path = dir.path().join("schema.json");
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 10);
    std::fs::write(&path, bytes).unwrap();

    assert!(Schema::load(dir.path()).is_err());
}
