//! Immutable, disk-backed, mmap-read tables ("SSTables") holding rows in
//! ascending sequence-number order, indexed by a static on-disk B+Tree.
//!
//! # On-disk layout
//!
//! ```text
//! header(256) | index_region(index_size) | data_region(data_size)
//! ```
//!
//! The header is a fixed 256-byte little-endian record carrying the magic,
//! version, region offsets/sizes, row count, and min/max seq and time
//! statistics, closed off by a CRC32 over the preceding fields. The index
//! region holds a [`crate::btree`] built bottom-up over `(seq, data_offset,
//! data_size)` triples; the data region holds ROW1-encoded row bytes
//! (`crate::schema::Schema::encode_row`) back to back in write order.
//!
//! # Sub-modules
//!
//! - [`writer`] — [`SstWriter`], which builds one immutable file from a
//!   sequence of already schema-encoded rows.
//! - [`reader`] — [`SstReader`], a zero-copy mmap reader backed by a
//!   [`crate::btree::BTreeReader`].
//! - [`manager`] — [`SSTableManager`], the registry of open readers used by
//!   the engine for point lookups and sorted scans.
//!
//! # Concurrency model
//!
//! Files are immutable once written, so reads never block on other reads.
//! The manager guards only the registry (the set of open readers), not the
//! files themselves.

pub mod manager;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use manager::SSTableManager;
pub use reader::SstReader;
pub use writer::{EncodedRow, SstWriter};

use std::io;

use crc32fast::Hasher as Crc32;
use thiserror::Error;

/// Errors returned by SSTable build, open, or lookup operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SSTableError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// B+Tree index region build or descent failure.
    #[error("B+Tree error: {0}")]
    BTree(#[from] crate::btree::BTreeError),

    /// Row codec failure (bad magic, truncated offset table, type mismatch).
    #[error("schema error: {0}")]
    Schema(#[from] crate::schema::SchemaError),

    /// Header or data region failed its integrity check.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Header magic, version, or a stored offset/size was invalid.
    #[error("corrupt SSTable: {0}")]
    Corruption(String),

    /// No rows were supplied to the writer — there is nothing to build.
    #[error("cannot build an SSTable from zero rows")]
    EmptyInput,
}

pub(crate) const SST_MAGIC: u32 = 0x5353_5433;
pub(crate) const SST_VERSION: u32 = 1;
pub(crate) const HEADER_SIZE: usize = 256;

/// Parsed SSTable header (the fixed 256-byte record at file offset 0).
#[derive(Debug, Clone, Copy)]
pub(crate) struct SstHeader {
    pub(crate) index_offset: u64,
    pub(crate) index_size: u64,
    pub(crate) root_offset: u64,
    pub(crate) data_offset: u64,
    pub(crate) data_size: u64,
    pub(crate) row_count: u64,
    pub(crate) min_key: i64,
    pub(crate) max_key: i64,
    pub(crate) min_time: i64,
    pub(crate) max_time: i64,
}

impl SstHeader {
    /// Serializes the header into a fresh 256-byte buffer, computing the
    /// trailing CRC32 over everything that precedes it.
    pub(crate) fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&SST_MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&SST_VERSION.to_le_bytes());
        buf[8] = 0; // compression: reserved, always 0
        buf[32..40].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[40..48].copy_from_slice(&self.index_size.to_le_bytes());
        buf[48..56].copy_from_slice(&self.root_offset.to_le_bytes());
        buf[64..72].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[72..80].copy_from_slice(&self.data_size.to_le_bytes());
        buf[80..88].copy_from_slice(&self.row_count.to_le_bytes());
        buf[96..104].copy_from_slice(&self.min_key.to_le_bytes());
        buf[104..112].copy_from_slice(&self.max_key.to_le_bytes());
        buf[112..120].copy_from_slice(&self.min_time.to_le_bytes());
        buf[120..128].copy_from_slice(&self.max_time.to_le_bytes());

        let mut hasher = Crc32::new();
        hasher.update(&buf[0..128]);
        let crc = hasher.finalize();
        buf[128..132].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parses and validates a header from the first 256 bytes of a file.
    pub(crate) fn decode(buf: &[u8]) -> Result<Self, SSTableError> {
        if buf.len() < HEADER_SIZE {
            return Err(SSTableError::Corruption("file shorter than header".into()));
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != SST_MAGIC {
            return Err(SSTableError::Corruption("bad magic".into()));
        }
        let version = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        if version != SST_VERSION {
            return Err(SSTableError::Corruption("unsupported version".into()));
        }

        let stored_crc = u32::from_le_bytes(buf[128..132].try_into().unwrap());
        let mut hasher = Crc32::new();
        hasher.update(&buf[0..128]);
        if hasher.finalize() != stored_crc {
            return Err(SSTableError::ChecksumMismatch);
        }

        Ok(Self {
            index_offset: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
            index_size: u64::from_le_bytes(buf[40..48].try_into().unwrap()),
            root_offset: u64::from_le_bytes(buf[48..56].try_into().unwrap()),
            data_offset: u64::from_le_bytes(buf[64..72].try_into().unwrap()),
            data_size: u64::from_le_bytes(buf[72..80].try_into().unwrap()),
            row_count: u64::from_le_bytes(buf[80..88].try_into().unwrap()),
            min_key: i64::from_le_bytes(buf[96..104].try_into().unwrap()),
            max_key: i64::from_le_bytes(buf[104..112].try_into().unwrap()),
            min_time: i64::from_le_bytes(buf[112..120].try_into().unwrap()),
            max_time: i64::from_le_bytes(buf[120..128].try_into().unwrap()),
        })
    }
}

/// Returns the canonical on-disk file name for a given file number, e.g.
/// `000007.sst`.
pub fn sst_file_name(file_number: u64) -> String {
    format!("{file_number:06}.sst")
}

/// Parses a file number out of a `NNNNNN.sst` file name.
pub fn parse_sst_file_name(name: &str) -> Option<u64> {
    name.strip_suffix(".sst")?.parse().ok()
}
