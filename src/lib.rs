//! # chronodb
//!
//! An embeddable, append-only time-series storage engine. Every insert is
//! assigned a monotonic sequence number that doubles as its primary key and
//! its time-ordering tie-break; there are no in-place updates or deletes —
//! only compaction-time de-duplication of rows that share a `seq`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Engine                           │
//! │  ┌────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │  Active     │  │  Immutable   │  │  SSTables   │  │
//! │  │  MemTable   │  │  MemTables   │  │  (on disk)  │  │
//! │  │  + WAL      │  │  + WALs      │  │             │  │
//! │  └─────┬───────┘  └──────┬───────┘  └──────┬──────┘  │
//! │        │   switch        │   flush         │         │
//! │        └─────────►       └────────►        │         │
//! │                                            │         │
//! │  ┌──────────────────────────────────────────┘         │
//! │  │  Compaction (rotating 4-level picker + GC)        │
//! │  └───────────────────────────────────────────────────┘│
//! │                                                      │
//! │  ┌──────────────────────────────────────────────────┐ │
//! │  │         VersionSet (MANIFEST + CURRENT)          │ │
//! │  └──────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Table coordinator — open, insert, get, scan, flush, close, clean, destroy |
//! | [`schema`] | Field declarations, `schema.json`, and the ROW1 row codec |
//! | [`memtable`] | In-memory `seq -> row bytes` write buffer, Active/Immutable split |
//! | [`wal`] | Generic, CRC-protected write-ahead log for crash recovery |
//! | [`sstable`] | Immutable, sorted, mmap-backed on-disk tables with a B+Tree index |
//! | [`btree`] | The on-disk B+Tree builder/reader used by `sstable` |
//! | [`manifest`] | Version/VersionEdit/MANIFEST metadata manager |
//! | [`compaction`] | Four-stage rotating leveled compaction picker, executor, and GC |
//! | [`index`] | The narrow secondary-index sink interface the engine feeds on insert |
//!
//! ## Key Features
//!
//! - **Append-only writes** — every insert gets a fresh, strictly
//!   increasing `seq`; there is no update-in-place or point delete.
//! - **Write-ahead logging** — every insert is persisted to a WAL before
//!   being acknowledged, guaranteeing durability and crash recovery.
//! - **Zero-copy reads** — SSTables are read via `mmap`, with a B+Tree
//!   index for point lookups.
//! - **Leveled compaction** — a four-stage picker (L0..L3) merges
//!   overlapping files and de-duplicates same-`seq` rows, keeping the one
//!   with the greater `time`.
//! - **Pluggable secondary indexing** — an [`index::IndexSink`] is fed
//!   `(field_value, seq)` on every insert for configured fields.
//! - **CRC32 integrity** — every on-disk block (WAL records, SSTable
//!   headers, MANIFEST records, `schema.json`) is checksummed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chronodb::engine::{Engine, EngineConfig};
//! use chronodb::schema::{FieldDef, FieldType, FieldValue};
//! use std::collections::BTreeMap;
//!
//! let schema_fields = vec![
//!     FieldDef { name: "sensor".into(), field_type: FieldType::String, nullable: false },
//!     FieldDef { name: "value".into(), field_type: FieldType::F64, nullable: false },
//! ];
//! let engine = Engine::open("/tmp/my_table", Some(schema_fields), EngineConfig::default()).unwrap();
//!
//! let mut fields = BTreeMap::new();
//! fields.insert("sensor".to_string(), FieldValue::String("temp-1".into()));
//! fields.insert("value".to_string(), FieldValue::F64(21.5));
//! let seq = engine.insert(fields).unwrap();
//!
//! let row = engine.get(seq).unwrap().unwrap();
//! assert_eq!(row.fields.get("sensor"), Some(&FieldValue::String("temp-1".into())));
//!
//! let rows: Vec<_> = engine.scan(i64::MIN, i64::MAX).unwrap().collect();
//! assert_eq!(rows.len(), 1);
//!
//! engine.flush().unwrap();
//! engine.close().unwrap();
//! ```

#![allow(dead_code)]

pub mod btree;
pub mod compaction;
pub mod engine;
pub mod index;
pub mod manifest;
pub mod memtable;
pub mod schema;
pub mod sstable;
pub mod wal;
