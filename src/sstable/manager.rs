//! `SSTableManager` — the registry of open SSTable readers.
//!
//! Owns every currently-live [`SstReader`] for one table. Writers
//! (flush and compaction) call [`SSTableManager::create_sst`] to produce
//! and register a new file; compaction later calls
//! [`SSTableManager::remove_reader`] once the MANIFEST edit retiring the
//! old files has committed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::schema::{Row, Schema};

use super::writer::{EncodedRow, SstWriteSummary};
use super::{SSTableError, SstReader, SstWriter, parse_sst_file_name, sst_file_name};

/// Owns the directory of `*.sst` files for one table and the set of open
/// readers over them.
pub struct SSTableManager {
    dir: PathBuf,
    readers: RwLock<Vec<Arc<SstReader>>>,
}

impl SSTableManager {
    /// Scans `dir` for existing `NNNNNN.sst` files and opens a reader over
    /// each one, reconstructing the registry after a restart.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SSTableError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut readers = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(file_number) = parse_sst_file_name(name) else { continue };
            readers.push(Arc::new(SstReader::open(entry.path(), file_number)?));
        }
        readers.sort_by_key(|r| r.min_key());

        Ok(Self { dir, readers: RwLock::new(readers) })
    }

    /// Writes `rows` to a new file numbered `file_number`, opens a reader
    /// over it, and registers it.
    pub fn create_sst(
        &self,
        file_number: u64,
        rows: &[EncodedRow],
    ) -> Result<(Arc<SstReader>, SstWriteSummary), SSTableError> {
        let path = self.dir.join(sst_file_name(file_number));
        let summary = SstWriter::new(&path).build(rows)?;
        let reader = Arc::new(SstReader::open(&path, file_number)?);
        self.add_reader(reader.clone());
        Ok((reader, summary))
    }

    /// Registers a reader that already exists on disk (used by compaction
    /// when handing the manager a file it just built).
    pub fn add_reader(&self, reader: Arc<SstReader>) {
        let mut readers = self.readers.write().expect("SSTableManager poisoned");
        readers.retain(|r| r.file_number() != reader.file_number());
        readers.push(reader);
        readers.sort_by_key(|r| r.min_key());
    }

    /// Drops the reader for `file_number` from the registry, if present.
    /// Does not touch the file on disk — the caller deletes it separately
    /// once the retiring MANIFEST edit has committed.
    pub fn remove_reader(&self, file_number: u64) {
        let mut readers = self.readers.write().expect("SSTableManager poisoned");
        readers.retain(|r| r.file_number() != file_number);
    }

    /// Unlinks the physical file for `file_number`, tolerating a missing
    /// file (already removed by a prior crash or a racing GC sweep).
    pub fn delete_file(&self, file_number: u64) -> Result<(), SSTableError> {
        match fs::remove_file(self.dir.join(sst_file_name(file_number))) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot of open readers, sorted ascending by min key, so a range
    /// scan visits them in sequence order.
    pub fn get_readers(&self) -> Vec<Arc<SstReader>> {
        self.readers.read().expect("SSTableManager poisoned").clone()
    }

    /// Looks up `seq` in the most-recently-created readers first. Recency is
    /// tracked by `file_number` (monotonically allocated by the
    /// `VersionSet`), not by `min_key`: a compaction output's `min_key` is
    /// the minimum over every input row it replaces, so it can sort *before*
    /// the stale files it supersedes in min-key order. A conflicting seq in
    /// two files means the one with the higher `file_number` wins.
    pub fn get(&self, schema: &Schema, seq: i64) -> Result<Option<Row>, SSTableError> {
        let mut readers = self.readers.read().expect("SSTableManager poisoned").clone();
        readers.sort_by_key(|r| r.file_number());
        for reader in readers.iter().rev() {
            if seq < reader.min_key() || seq > reader.max_key() {
                continue;
            }
            if let Some(row) = reader.get(schema, seq)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Same as [`Self::get`] but decodes only `fields`.
    pub fn get_partial(
        &self,
        schema: &Schema,
        seq: i64,
        fields: &[String],
    ) -> Result<Option<Row>, SSTableError> {
        let mut readers = self.readers.read().expect("SSTableManager poisoned").clone();
        readers.sort_by_key(|r| r.file_number());
        for reader in readers.iter().rev() {
            if seq < reader.min_key() || seq > reader.max_key() {
                continue;
            }
            if let Some(row) = reader.get_partial(schema, seq, fields)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// The highest `seq` stored across all registered files, or `-1` if
    /// none exist yet — used by the engine to resume sequence assignment.
    pub fn get_max_seq(&self) -> i64 {
        self.readers
            .read()
            .expect("SSTableManager poisoned")
            .iter()
            .map(|r| r.max_key())
            .max()
            .unwrap_or(-1)
    }
}
