//! `VersionEdit`: the minimal delta applied to produce the next `Version`,
//! and its on-disk framing inside a `MANIFEST-<n>` file.

use std::io::{self, Read, Write};

use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};

use super::version::FileMetadata;
use super::ManifestError;

const U32_SIZE: usize = std::mem::size_of::<u32>();

/// A delta against the current `Version`: files gained, files lost, and
/// optionally a new floor for the file-number and sequence-number
/// counters. Serialized as tagged JSON so the format can gain fields
/// without breaking readers of older manifests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionEdit {
    #[serde(default)]
    pub added_files: Vec<FileMetadata>,
    #[serde(default)]
    pub deleted_files: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_file_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sequence: Option<i64>,
}

impl VersionEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, file: FileMetadata) -> Self {
        self.added_files.push(file);
        self
    }

    pub fn delete_file(mut self, file_number: u64) -> Self {
        self.deleted_files.push(file_number);
        self
    }

    pub fn with_next_file_number(mut self, next: u64) -> Self {
        self.next_file_number = Some(next);
        self
    }

    pub fn with_last_sequence(mut self, seq: i64) -> Self {
        self.last_sequence = Some(seq);
        self
    }

    /// Frames this edit as `crc32(4) | length(4) | serialized_edit(length)`
    /// and appends it to `writer`.
    pub fn write_framed<W: Write>(&self, writer: &mut W) -> Result<(), ManifestError> {
        let payload = serde_json::to_vec(self)?;
        let mut hasher = Crc32::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        writer.write_all(&crc.to_le_bytes())?;
        writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        writer.write_all(&payload)?;
        Ok(())
    }

    /// Reads one framed edit from `reader`. Returns `Ok(None)` at a clean
    /// end-of-file (no bytes read at all), which distinguishes "no more
    /// records" from a truncated trailing record.
    pub fn read_framed<R: Read>(reader: &mut R) -> Result<Option<Self>, ManifestError> {
        let mut crc_buf = [0u8; U32_SIZE];
        match read_exact_or_eof(reader, &mut crc_buf)? {
            false => return Ok(None),
            true => {}
        }
        let expected_crc = u32::from_le_bytes(crc_buf);

        let mut len_buf = [0u8; U32_SIZE];
        if !read_exact_or_eof(reader, &mut len_buf)? {
            return Err(ManifestError::TruncatedRecord);
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        if !read_exact_or_eof(reader, &mut payload)? {
            return Err(ManifestError::TruncatedRecord);
        }

        let mut hasher = Crc32::new();
        hasher.update(&payload);
        if hasher.finalize() != expected_crc {
            return Err(ManifestError::ChecksumMismatch);
        }

        let edit: VersionEdit = serde_json::from_slice(&payload)?;
        Ok(Some(edit))
    }
}

/// Like `Read::read_exact`, but returns `Ok(false)` instead of erroring
/// when the very first byte read hits EOF (a clean end of stream), and
/// still returns an error for a read that starts successfully but runs
/// out partway (a truncated record).
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    Ok(false)
                } else {
                    Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated manifest record"))
                };
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
