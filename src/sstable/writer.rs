//! SSTable writer — builds one complete, immutable file from a stream of
//! already schema-encoded rows in ascending sequence order.
//!
//! # Atomicity
//!
//! 1. Write everything to `path.tmp`.
//! 2. Flush and `fsync` the file.
//! 3. Rename `path.tmp` → `path` atomically.
//!
//! A crash cannot produce a partially-written SSTable: readers only ever
//! see the final name once every byte is durable.

use std::fs::{OpenOptions, rename};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::btree::BTreeBuilder;

use super::{HEADER_SIZE, SSTableError, SstHeader};

/// One already schema-encoded row, ready to be appended to an SSTable.
pub struct EncodedRow {
    pub seq: i64,
    pub time: i64,
    pub bytes: Vec<u8>,
}

/// Summary statistics returned after a successful build, used by the
/// caller to construct a `FileMetadata` for the MANIFEST.
#[derive(Debug, Clone, Copy)]
pub struct SstWriteSummary {
    pub row_count: u64,
    pub file_size: u64,
    pub min_key: i64,
    pub max_key: i64,
    pub min_time: i64,
    pub max_time: i64,
}

/// Builds one SSTable file on disk from a fully materialized, ascending-seq
/// row slice.
pub struct SstWriter<'a> {
    path: &'a Path,
}

impl<'a> SstWriter<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Consumes `rows` (already in ascending `seq` order — the writer does
    /// not re-sort) and writes a complete SSTable.
    pub fn build(self, rows: &[EncodedRow]) -> Result<SstWriteSummary, SSTableError> {
        if rows.is_empty() {
            return Err(SSTableError::EmptyInput);
        }

        let tmp_path = self.path.with_extension("sst.tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let index_region_size = BTreeBuilder::estimate_size(rows.len());
        let data_offset = HEADER_SIZE as u64 + index_region_size as u64;

        // Reserve header + index region with zeroed placeholder bytes.
        file.write_all(&vec![0u8; HEADER_SIZE + index_region_size])?;

        let mut builder = BTreeBuilder::new();
        let mut min_time = i64::MAX;
        let mut max_time = i64::MIN;
        let mut data_cursor = data_offset;

        for row in rows {
            file.write_all(&row.bytes)?;
            builder.push(row.seq, data_cursor, row.bytes.len() as u32);
            data_cursor += row.bytes.len() as u64;
            min_time = min_time.min(row.time);
            max_time = max_time.max(row.time);
        }

        let min_key = builder.min_key().expect("rows non-empty");
        let max_key = builder.max_key().expect("rows non-empty");
        let row_count = builder.len() as u64;

        let mut index_bytes = Vec::with_capacity(index_region_size);
        let root_offset = builder.build(HEADER_SIZE as u64, &mut index_bytes)?;

        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        file.write_all(&index_bytes)?;

        let data_size = data_cursor - data_offset;
        let header = SstHeader {
            index_offset: HEADER_SIZE as u64,
            index_size: index_region_size as u64,
            root_offset,
            data_offset,
            data_size,
            row_count,
            min_key,
            max_key,
            min_time,
            max_time,
        };
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;

        file.flush()?;
        file.sync_all()?;
        drop(file);
        rename(&tmp_path, self.path)?;

        Ok(SstWriteSummary {
            row_count,
            file_size: data_cursor,
            min_key,
            max_key,
            min_time,
            max_time,
        })
    }
}
