use crate::schema::{FieldDef, FieldType, FieldValue, Row, Schema};
use std::collections::BTreeMap;

fn schema_with(field_type: FieldType) -> Schema {
    Schema::new(vec![FieldDef { name: "v".into(), field_type, nullable: false }])
}

fn row_with(value: FieldValue) -> Row {
    let mut fields = BTreeMap::new();
    fields.insert("v".into(), value);
    Row { seq: 1, time: 0, fields }
}

#[test]
fn integer_widens_to_wider_integer() {
    let schema = schema_with(FieldType::I64);
    let mut row = row_with(FieldValue::I32(7));
    schema.validate(&mut row).unwrap();
    assert_eq!(row.fields.get("v"), Some(&FieldValue::I64(7)));
}

#[test]
fn whole_valued_float_coerces_to_integer() {
    let schema = schema_with(FieldType::I32);
    let mut row = row_with(FieldValue::F64(3.0));
    schema.validate(&mut row).unwrap();
    assert_eq!(row.fields.get("v"), Some(&FieldValue::I32(3)));
}

#[test]
fn fractional_float_rejected_for_integer_target() {
    let schema = schema_with(FieldType::I32);
    let mut row = row_with(FieldValue::F64(3.5));
    assert!(schema.validate(&mut row).is_err());
}

#[test]
fn integer_promotes_to_float() {
    let schema = schema_with(FieldType::F64);
    let mut row = row_with(FieldValue::I32(5));
    schema.validate(&mut row).unwrap();
    assert_eq!(row.fields.get("v"), Some(&FieldValue::F64(5.0)));
}

#[test]
fn out_of_range_narrowing_is_rejected() {
    let schema = schema_with(FieldType::I8);
    let mut row = row_with(FieldValue::I32(1000));
    assert!(schema.validate(&mut row).is_err());
}
