use std::collections::BTreeMap;

use crate::schema::{FieldDef, FieldType, FieldValue};

pub fn sample_schema_fields() -> Vec<FieldDef> {
    vec![
        FieldDef { name: "id".into(), field_type: FieldType::I64, nullable: false },
        FieldDef { name: "name".into(), field_type: FieldType::String, nullable: false },
        FieldDef { name: "score".into(), field_type: FieldType::F64, nullable: true },
    ]
}

pub fn row_fields(id: i64, name: &str) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), FieldValue::I64(id));
    fields.insert("name".to_string(), FieldValue::String(name.to_string()));
    fields.insert("score".to_string(), FieldValue::Null);
    fields
}
