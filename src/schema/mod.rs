//! Row schema and the ROW1 binary row format.
//!
//! The schema/type-system module proper is out of scope for this crate (it
//! is consumed only through the `SchemaCodec` trait); this module provides
//! the minimal concrete implementation needed to drive the storage engine
//! end to end: a dynamically-typed field model, a `schema.json` side-car
//! descriptor, and the ROW1 encode/decode/partial-decode codec.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by schema validation, persistence, or row coercion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// A row field's type could not be coerced into the schema's declared type.
    #[error("field '{field}' cannot be coerced into {expected:?}")]
    Coercion { field: String, expected: FieldType },

    /// A non-nullable field was missing or null.
    #[error("field '{0}' is required but missing")]
    MissingField(String),

    /// The row contained a field not declared in the schema.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// `schema.json` failed its trailing checksum or is structurally invalid.
    #[error("schema descriptor corrupted: {0}")]
    Corruption(String),

    /// Underlying I/O error persisting or loading the descriptor.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A ROW1 frame failed to decode (bad magic, truncated offset table, ...).
    #[error("row decode error: {0}")]
    RowDecode(String),
}

/// The set of field types a [`Schema`] can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Byte,
    String,
    Decimal,
    Timestamp,
    Object,
    Array,
}

/// A typed value for one row field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Byte(u8),
    String(String),
    Decimal(i64),
    Timestamp(i64),
    Object(serde_json::Value),
    Array(serde_json::Value),
    Null,
}

impl FieldValue {
    fn field_type(&self) -> Option<FieldType> {
        Some(match self {
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Byte(_) => FieldType::Byte,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Decimal(_) => FieldType::Decimal,
            FieldValue::Timestamp(_) => FieldType::Timestamp,
            FieldValue::Object(_) => FieldType::Object,
            FieldValue::Array(_) => FieldType::Array,
            FieldValue::Null => return None,
        })
    }

    /// Coerces `self` into `target`, per the rules in SPEC_FULL §4.7/§9:
    /// integer↔integer of compatible signedness, integer→float promotion,
    /// whole-valued float→integer.
    fn coerce(self, target: FieldType) -> Result<FieldValue, FieldValue> {
        if self.field_type() == Some(target) {
            return Ok(self);
        }
        let as_i64 = match &self {
            FieldValue::I8(v) => Some(*v as i64),
            FieldValue::I16(v) => Some(*v as i64),
            FieldValue::I32(v) => Some(*v as i64),
            FieldValue::I64(v) => Some(*v),
            FieldValue::U8(v) => Some(*v as i64),
            FieldValue::U16(v) => Some(*v as i64),
            FieldValue::U32(v) => Some(*v as i64),
            FieldValue::U64(v) => i64::try_from(*v).ok(),
            FieldValue::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            FieldValue::F32(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        };
        let as_f64 = match &self {
            FieldValue::I8(v) => Some(*v as f64),
            FieldValue::I16(v) => Some(*v as f64),
            FieldValue::I32(v) => Some(*v as f64),
            FieldValue::I64(v) => Some(*v as f64),
            FieldValue::U8(v) => Some(*v as f64),
            FieldValue::U16(v) => Some(*v as f64),
            FieldValue::U32(v) => Some(*v as f64),
            FieldValue::U64(v) => Some(*v as f64),
            FieldValue::F32(v) => Some(*v as f64),
            _ => None,
        };

        match target {
            FieldType::I8 => as_i64.and_then(|v| i8::try_from(v).ok()).map(FieldValue::I8),
            FieldType::I16 => as_i64.and_then(|v| i16::try_from(v).ok()).map(FieldValue::I16),
            FieldType::I32 => as_i64.and_then(|v| i32::try_from(v).ok()).map(FieldValue::I32),
            FieldType::I64 | FieldType::Decimal | FieldType::Timestamp => as_i64.map(|v| match target {
                FieldType::Decimal => FieldValue::Decimal(v),
                FieldType::Timestamp => FieldValue::Timestamp(v),
                _ => FieldValue::I64(v),
            }),
            FieldType::U8 => as_i64.and_then(|v| u8::try_from(v).ok()).map(FieldValue::U8),
            FieldType::U16 => as_i64.and_then(|v| u16::try_from(v).ok()).map(FieldValue::U16),
            FieldType::U32 => as_i64.and_then(|v| u32::try_from(v).ok()).map(FieldValue::U32),
            FieldType::U64 => as_i64.and_then(|v| u64::try_from(v).ok()).map(FieldValue::U64),
            FieldType::F32 => as_f64.map(|v| FieldValue::F32(v as f32)),
            FieldType::F64 => as_f64.map(FieldValue::F64),
            _ => None,
        }
        .ok_or(self)
    }

    fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// One declared column: name, type, and whether `Null` is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaDescriptor {
    fields: Vec<FieldDef>,
}

/// An ordered list of field declarations describing every row this table
/// accepts, plus a checksum over its canonical encoding.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDef>,
    checksum: u32,
}

/// A fully typed row: the system-assigned `seq`/`time` plus user fields in
/// schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub seq: i64,
    pub time: i64,
    pub fields: BTreeMap<String, FieldValue>,
}

const ROW1_MAGIC: u32 = 0x524F_5731;

impl Schema {
    /// Builds a schema from field declarations, computing its checksum.
    pub fn new(fields: Vec<FieldDef>) -> Self {
        let checksum = Self::compute_checksum(&fields);
        Self { fields, checksum }
    }

    fn compute_checksum(fields: &[FieldDef]) -> u32 {
        let bytes = serde_json::to_vec(&SchemaDescriptor {
            fields: fields.to_vec(),
        })
        .expect("field defs always serialize");
        let mut hasher = Crc32::new();
        hasher.update(&bytes);
        hasher.finalize()
    }

    /// The declared fields, in schema order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// CRC32 over the canonical JSON encoding of the field list.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Persists `schema.json` (descriptor bytes followed by a trailing
    /// 4-byte CRC32) to `dir`.
    pub fn persist(&self, dir: &Path) -> Result<(), SchemaError> {
        let descriptor = SchemaDescriptor {
            fields: self.fields.clone(),
        };
        let mut bytes = serde_json::to_vec_pretty(&descriptor)?;
        let mut hasher = Crc32::new();
        hasher.update(&bytes);
        let crc = hasher.finalize();
        bytes.extend_from_slice(&crc.to_le_bytes());
        fs::write(dir.join("schema.json"), bytes)?;
        Ok(())
    }

    /// Loads and validates `schema.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, SchemaError> {
        let bytes = fs::read(dir.join("schema.json"))?;
        if bytes.len() < 4 {
            return Err(SchemaError::Corruption("schema.json too short".into()));
        }
        let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
        let stored_crc = u32::from_le_bytes(crc_bytes.try_into().unwrap());
        let mut hasher = Crc32::new();
        hasher.update(body);
        if hasher.finalize() != stored_crc {
            return Err(SchemaError::Corruption("checksum mismatch".into()));
        }
        let descriptor: SchemaDescriptor = serde_json::from_slice(body)?;
        Ok(Self::new(descriptor.fields))
    }

    /// Structural + type + nullability validation, coercing values in place
    /// where the coercion rules allow it.
    pub fn validate(&self, row: &mut Row) -> Result<(), SchemaError> {
        let declared: std::collections::HashSet<&str> =
            self.fields.iter().map(|f| f.name.as_str()).collect();
        for key in row.fields.keys() {
            if !declared.contains(key.as_str()) {
                return Err(SchemaError::UnknownField(key.clone()));
            }
        }

        for field in &self.fields {
            match row.fields.remove(&field.name) {
                Some(value) if value.is_null() => {
                    if !field.nullable {
                        return Err(SchemaError::MissingField(field.name.clone()));
                    }
                    row.fields.insert(field.name.clone(), FieldValue::Null);
                }
                Some(value) => {
                    let coerced = value.coerce(field.field_type).map_err(|_| SchemaError::Coercion {
                        field: field.name.clone(),
                        expected: field.field_type,
                    })?;
                    row.fields.insert(field.name.clone(), coerced);
                }
                None => {
                    if !field.nullable {
                        return Err(SchemaError::MissingField(field.name.clone()));
                    }
                    row.fields.insert(field.name.clone(), FieldValue::Null);
                }
            }
        }
        Ok(())
    }

    /// Encodes `row` as a ROW1 frame.
    pub fn encode_row(&self, row: &Row) -> Result<Vec<u8>, SchemaError> {
        let mut field_data = Vec::new();
        let mut offsets = Vec::with_capacity(self.fields.len());

        for field in &self.fields {
            let start = field_data.len();
            let value = row.fields.get(&field.name).unwrap_or(&FieldValue::Null);
            encode_field(&mut field_data, field.field_type, value);
            offsets.push((start as u32, (field_data.len() - start) as u32));
        }

        let mut out = Vec::with_capacity(4 + 8 + 8 + 2 + offsets.len() * 8 + field_data.len());
        out.extend_from_slice(&ROW1_MAGIC.to_le_bytes());
        out.extend_from_slice(&row.seq.to_le_bytes());
        out.extend_from_slice(&row.time.to_le_bytes());
        out.extend_from_slice(&(self.fields.len() as u16).to_le_bytes());
        for (offset, size) in &offsets {
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
        }
        out.extend_from_slice(&field_data);
        Ok(out)
    }

    /// Fully decodes a ROW1 frame.
    pub fn decode_row(&self, bytes: &[u8]) -> Result<Row, SchemaError> {
        let wanted: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();
        self.decode_partial(bytes, &wanted)
    }

    /// Decodes only the named fields out of a ROW1 frame, skipping the rest
    /// of the field-data region via the offset table.
    pub fn decode_partial(&self, bytes: &[u8], field_set: &[String]) -> Result<Row, SchemaError> {
        if bytes.len() < 22 {
            return Err(SchemaError::RowDecode("frame too short".into()));
        }
        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if magic != ROW1_MAGIC {
            return Err(SchemaError::RowDecode("bad ROW1 magic".into()));
        }
        let seq = i64::from_le_bytes(bytes[4..12].try_into().unwrap());
        let time = i64::from_le_bytes(bytes[12..20].try_into().unwrap());
        let field_count = u16::from_le_bytes(bytes[20..22].try_into().unwrap()) as usize;
        if field_count != self.fields.len() {
            return Err(SchemaError::RowDecode("field count mismatch".into()));
        }

        let table_start = 22;
        let table_len = field_count * 8;
        let data_start = table_start + table_len;
        if bytes.len() < data_start {
            return Err(SchemaError::RowDecode("truncated offset table".into()));
        }
        let field_data = &bytes[data_start..];

        let wanted: std::collections::HashSet<&str> = field_set.iter().map(|s| s.as_str()).collect();
        let mut fields = BTreeMap::new();

        for (i, field) in self.fields.iter().enumerate() {
            if !wanted.contains(field.name.as_str()) {
                continue;
            }
            let entry_off = table_start + i * 8;
            let offset = u32::from_le_bytes(bytes[entry_off..entry_off + 4].try_into().unwrap()) as usize;
            let size = u32::from_le_bytes(bytes[entry_off + 4..entry_off + 8].try_into().unwrap()) as usize;
            if offset + size > field_data.len() {
                return Err(SchemaError::RowDecode("field offset out of bounds".into()));
            }
            let slice = &field_data[offset..offset + size];
            let value = decode_field(field.field_type, slice)?;
            fields.insert(field.name.clone(), value);
        }

        Ok(Row { seq, time, fields })
    }
}

fn encode_field(out: &mut Vec<u8>, field_type: FieldType, value: &FieldValue) {
    if value.is_null() {
        zero_fill(out, field_type);
        return;
    }
    match (field_type, value) {
        (FieldType::I8, FieldValue::I8(v)) => out.push(*v as u8),
        (FieldType::I16, FieldValue::I16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::I32, FieldValue::I32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::I64, FieldValue::I64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::U8, FieldValue::U8(v)) => out.push(*v),
        (FieldType::U16, FieldValue::U16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::U32, FieldValue::U32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::U64, FieldValue::U64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::F32, FieldValue::F32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::F64, FieldValue::F64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::Bool, FieldValue::Bool(v)) => out.push(*v as u8),
        (FieldType::Byte, FieldValue::Byte(v)) => out.push(*v),
        (FieldType::Decimal, FieldValue::Decimal(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::Timestamp, FieldValue::Timestamp(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FieldType::String, FieldValue::String(s)) => {
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        (FieldType::Object, FieldValue::Object(v)) | (FieldType::Array, FieldValue::Array(v)) => {
            let bytes = serde_json::to_vec(v).unwrap_or_default();
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(&bytes);
        }
        _ => zero_fill(out, field_type),
    }
}

fn zero_fill(out: &mut Vec<u8>, field_type: FieldType) {
    let width = match field_type {
        FieldType::I8 | FieldType::U8 | FieldType::Bool | FieldType::Byte => 1,
        FieldType::I16 | FieldType::U16 => 2,
        FieldType::I32 | FieldType::U32 | FieldType::F32 => 4,
        FieldType::I64
        | FieldType::U64
        | FieldType::F64
        | FieldType::Decimal
        | FieldType::Timestamp => 8,
        FieldType::String | FieldType::Object | FieldType::Array => 4,
    };
    out.extend(std::iter::repeat(0u8).take(width));
}

fn decode_field(field_type: FieldType, bytes: &[u8]) -> Result<FieldValue, SchemaError> {
    let err = || SchemaError::RowDecode("field payload truncated".into());
    Ok(match field_type {
        FieldType::I8 => FieldValue::I8(*bytes.first().ok_or_else(err)? as i8),
        FieldType::I16 => FieldValue::I16(i16::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::I32 => FieldValue::I32(i32::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::I64 => FieldValue::I64(i64::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::U8 => FieldValue::U8(*bytes.first().ok_or_else(err)?),
        FieldType::U16 => FieldValue::U16(u16::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::U32 => FieldValue::U32(u32::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::U64 => FieldValue::U64(u64::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::F32 => FieldValue::F32(f32::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::F64 => FieldValue::F64(f64::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::Bool => FieldValue::Bool(*bytes.first().ok_or_else(err)? != 0),
        FieldType::Byte => FieldValue::Byte(*bytes.first().ok_or_else(err)?),
        FieldType::Decimal => FieldValue::Decimal(i64::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::Timestamp => FieldValue::Timestamp(i64::from_le_bytes(bytes.try_into().map_err(|_| err())?)),
        FieldType::String => {
            if bytes.len() < 4 {
                return Err(err());
            }
            let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
            let s = std::str::from_utf8(bytes.get(4..4 + len).ok_or_else(err)?)
                .map_err(|_| SchemaError::RowDecode("invalid utf8".into()))?;
            FieldValue::String(s.to_string())
        }
        FieldType::Object | FieldType::Array => {
            if bytes.len() < 4 {
                return Err(err());
            }
            let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
            let slice = bytes.get(4..4 + len).ok_or_else(err)?;
            let value: serde_json::Value = if slice.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(slice)?
            };
            if matches!(field_type, FieldType::Object) {
                FieldValue::Object(value)
            } else {
                FieldValue::Array(value)
            }
        }
    })
}
