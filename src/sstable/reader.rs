//! SSTable reader — a zero-copy, mmap-backed view over one immutable file.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::btree::BTreeReader;
use crate::schema::{Row, Schema};

use super::{SSTableError, SstHeader};

/// An opened, memory-mapped SSTable file.
pub struct SstReader {
    path: PathBuf,
    file_number: u64,
    mmap: Mmap,
    header: SstHeader,
}

impl SstReader {
    /// Opens `path`, validates its header, and prepares it for point
    /// lookups and full-key enumeration.
    pub fn open(path: impl AsRef<Path>, file_number: u64) -> Result<Self, SSTableError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let header = SstHeader::decode(&mmap)?;

        let file_len = mmap.len() as u64;
        if header.data_offset + header.data_size > file_len {
            return Err(SSTableError::Corruption("data region exceeds file length".into()));
        }

        Ok(Self { path, file_number, mmap, header })
    }

    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn row_count(&self) -> u64 {
        self.header.row_count
    }

    pub fn min_key(&self) -> i64 {
        self.header.min_key
    }

    pub fn max_key(&self) -> i64 {
        self.header.max_key
    }

    pub fn min_time(&self) -> i64 {
        self.header.min_time
    }

    pub fn max_time(&self) -> i64 {
        self.header.max_time
    }

    pub fn file_size(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn btree(&self) -> BTreeReader<'_> {
        BTreeReader::new(&self.mmap, self.header.root_offset)
    }

    fn row_bytes(&self, seq: i64) -> Result<Option<&[u8]>, SSTableError> {
        let Some((offset, size)) = self.btree().get(seq)? else {
            return Ok(None);
        };
        let start = offset as usize;
        let end = start
            .checked_add(size as usize)
            .ok_or_else(|| SSTableError::Corruption("row extent overflow".into()))?;
        self.mmap
            .get(start..end)
            .map(Some)
            .ok_or_else(|| SSTableError::Corruption("row offset out of bounds".into()))
    }

    /// Full decode of the row at `seq`, or `None` if this file doesn't
    /// contain it.
    pub fn get(&self, schema: &Schema, seq: i64) -> Result<Option<Row>, SSTableError> {
        match self.row_bytes(seq)? {
            Some(bytes) => Ok(Some(schema.decode_row(bytes)?)),
            None => Ok(None),
        }
    }

    /// Decodes only `fields` out of the row at `seq`.
    pub fn get_partial(
        &self,
        schema: &Schema,
        seq: i64,
        fields: &[String],
    ) -> Result<Option<Row>, SSTableError> {
        match self.row_bytes(seq)? {
            Some(bytes) => Ok(Some(schema.decode_partial(bytes, fields)?)),
            None => Ok(None),
        }
    }

    /// Every key (`seq`) stored in this file, in ascending order — used by
    /// compaction to enumerate a file's contents without decoding rows.
    pub fn get_all_keys(&self) -> Result<Vec<i64>, SSTableError> {
        Ok(self.btree().get_all_keys()?)
    }

    /// All rows in this file, fully decoded, in ascending `seq` order — used
    /// by compaction to build the merged working set.
    pub fn read_all(&self, schema: &Schema) -> Result<Vec<Row>, SSTableError> {
        self.get_all_keys()?
            .into_iter()
            .map(|seq| {
                self.get(schema, seq)?
                    .ok_or_else(|| SSTableError::Corruption("key missing from data region".into()))
            })
            .collect()
    }

    /// All rows in this file as raw ROW1 bytes, without decoding through a
    /// schema — used by the compactor, which only needs to re-sort and
    /// rewrite rows, never inspect their fields.
    pub fn read_all_encoded(&self) -> Result<Vec<super::writer::EncodedRow>, SSTableError> {
        self.get_all_keys()?
            .into_iter()
            .map(|seq| {
                let bytes = self
                    .row_bytes(seq)?
                    .ok_or_else(|| SSTableError::Corruption("key missing from data region".into()))?;
                if bytes.len() < 20 {
                    return Err(SSTableError::Corruption("row shorter than ROW1 header".into()));
                }
                let time = i64::from_le_bytes(bytes[12..20].try_into().unwrap());
                Ok(super::writer::EncodedRow { seq, time, bytes: bytes.to_vec() })
            })
            .collect()
    }
}
