//! Write-Ahead Log (WAL)
//!
//! Durable, append-only, CRC-protected log of insert records. Every successful
//! `insert` is written here before being acknowledged, so the log is the
//! crash-recovery source of truth for a MemTable epoch.
//!
//! # On-disk record framing
//!
//! ```text
//! crc32(4) | length(4) | type(1) | seq(8) | data_length(4) | data(data_length)
//! ```
//!
//! `crc32` covers every byte from `length` through `data`. `type = 1` is the
//! only record type defined today (`RECORD_TYPE_PUT`). A trailing partial
//! record or CRC mismatch ends replay at the last good record rather than
//! raising an error — the most recent incomplete write is silently discarded.
//!
//! # Concurrency model
//!
//! A single [`Wal`] is only ever appended to by the thread holding the active
//! MemTable's write lock, but the file handle is still wrapped in
//! `Arc<Mutex<File>>` so [`WalIter`] can replay concurrently with a live
//! writer without racing on the file cursor.
//!
//! [`WalManager`] owns the `wal/` directory: it tracks the current WAL file
//! number, persists it in a `CURRENT` pointer file (temp-file + rename for
//! atomicity), rotates to a new epoch on MemTable switch, deletes WAL files
//! once their MemTable has been flushed, and replays every `*.wal` file in
//! ascending number order during recovery.

#[cfg(test)]
mod tests;

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use crc32fast::Hasher as Crc32;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

const U32_SIZE: usize = std::mem::size_of::<u32>();

/// The only record type this engine writes today.
pub const RECORD_TYPE_PUT: u8 = 1;

/// Errors returned by WAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WalError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Data integrity failure — checksum did not match.
    #[error("checksum mismatch at offset {0}")]
    ChecksumMismatch(u64),

    /// WAL file name did not match the `<number>.wal` pattern.
    #[error("invalid WAL file name: {0}")]
    InvalidFileName(String),

    /// Internal consistency or locking error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A single decoded WAL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// Record type; currently always [`RECORD_TYPE_PUT`].
    pub record_type: u8,
    /// Sequence number assigned to this row at insert time.
    pub seq: i64,
    /// Schema-codec-encoded row bytes.
    pub payload: Vec<u8>,
}

impl WalRecord {
    /// Builds a `Put` record for the given sequence number and row bytes.
    pub fn put(seq: i64, payload: Vec<u8>) -> Self {
        Self {
            record_type: RECORD_TYPE_PUT,
            seq,
            payload,
        }
    }

    fn frame(&self) -> Vec<u8> {
        let data_len = self.payload.len() as u32;
        // length covers type(1) + seq(8) + data_length(4) + data(data_len)
        let length = 1 + 8 + 4 + data_len;

        let mut body = Vec::with_capacity(length as usize);
        body.push(self.record_type);
        body.extend_from_slice(&self.seq.to_le_bytes());
        body.extend_from_slice(&data_len.to_le_bytes());
        body.extend_from_slice(&self.payload);

        let mut hasher = Crc32::new();
        hasher.update(&length.to_le_bytes());
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut frame = Vec::with_capacity(4 + 4 + body.len());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&body);
        frame
    }
}

/// An append-only log file for a single MemTable epoch.
#[derive(Debug)]
pub struct Wal {
    inner_file: Arc<Mutex<File>>,
    path: PathBuf,
    number: u64,
}

impl Wal {
    /// Opens (creating if absent) the WAL file for epoch `number` in `dir`.
    pub fn open(dir: &Path, number: u64) -> Result<Self, WalError> {
        let path = wal_path(dir, number);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        info!(path = %path.display(), number, "WAL opened");

        Ok(Self {
            inner_file: Arc::new(Mutex::new(file)),
            path,
            number,
        })
    }

    /// The epoch number of this WAL.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a single record frame and fsyncs before returning.
    pub fn append(&self, record: &WalRecord) -> Result<(), WalError> {
        let frame = record.frame();

        let mut guard = self
            .inner_file
            .lock()
            .map_err(|_| WalError::Internal("mutex poisoned".into()))?;
        guard.write_all(&frame)?;
        guard.sync_all()?;

        trace!(seq = record.seq, bytes = frame.len(), "WAL record appended");
        Ok(())
    }

    /// Forces a durability sync without appending.
    pub fn sync(&self) -> Result<(), WalError> {
        let guard = self
            .inner_file
            .lock()
            .map_err(|_| WalError::Internal("mutex poisoned".into()))?;
        guard.sync_all()?;
        Ok(())
    }

    /// Truncates the file back to empty.
    pub fn truncate(&self) -> Result<(), WalError> {
        let mut guard = self
            .inner_file
            .lock()
            .map_err(|_| WalError::Internal("mutex poisoned".into()))?;
        guard.set_len(0)?;
        guard.seek(SeekFrom::Start(0))?;
        guard.sync_all()?;
        Ok(())
    }

    /// Returns an iterator replaying every complete, checksum-valid record.
    pub fn iter(&self) -> Result<WalIter, WalError> {
        Ok(WalIter {
            file: Arc::clone(&self.inner_file),
            offset: 0,
        })
    }
}

/// Streaming WAL replay iterator. Stops cleanly (returns `None`) at EOF or at
/// the first truncated/corrupt trailing record rather than erroring.
pub struct WalIter {
    file: Arc<Mutex<File>>,
    offset: u64,
}

impl Iterator for WalIter {
    type Item = WalRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let mut guard = self.file.lock().ok()?;

        guard.seek(SeekFrom::Start(self.offset)).ok()?;

        let mut crc_bytes = [0u8; U32_SIZE];
        if guard.read_exact(&mut crc_bytes).is_err() {
            return None;
        }
        let stored_crc = u32::from_le_bytes(crc_bytes);

        let mut len_bytes = [0u8; U32_SIZE];
        if guard.read_exact(&mut len_bytes).is_err() {
            return None;
        }
        let length = u32::from_le_bytes(len_bytes) as usize;

        if length < 1 + 8 + 4 {
            warn!(offset = self.offset, "WAL record length too small, stopping replay");
            return None;
        }

        let mut body = vec![0u8; length];
        if guard.read_exact(&mut body).is_err() {
            warn!(offset = self.offset, "WAL trailing record truncated, stopping replay");
            return None;
        }

        let mut hasher = Crc32::new();
        hasher.update(&len_bytes);
        hasher.update(&body);
        if hasher.finalize() != stored_crc {
            warn!(offset = self.offset, "WAL record checksum mismatch, stopping replay");
            return None;
        }

        let record_type = body[0];
        let seq = i64::from_le_bytes(body[1..9].try_into().ok()?);
        let data_len = u32::from_le_bytes(body[9..13].try_into().ok()?) as usize;
        if 13 + data_len != body.len() {
            warn!(offset = self.offset, "WAL record data length mismatch, stopping replay");
            return None;
        }
        let payload = body[13..13 + data_len].to_vec();

        self.offset += (4 + 4 + length) as u64;

        Some(WalRecord {
            record_type,
            seq,
            payload,
        })
    }
}

fn wal_path(dir: &Path, number: u64) -> PathBuf {
    dir.join(format!("{number:06}.wal"))
}

fn parse_wal_number(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".wal")?.parse().ok()
}

const CURRENT_FILE: &str = "CURRENT";

/// Owns the `wal/` directory: current epoch tracking, rotation, deletion and
/// full-directory recovery.
#[derive(Debug)]
pub struct WalManager {
    dir: PathBuf,
    current_number: AtomicU64,
    current: Mutex<Arc<Wal>>,
}

impl WalManager {
    /// Opens (creating if absent) the WAL directory and its current epoch.
    ///
    /// If a `CURRENT` pointer exists, the WAL it names is opened for
    /// continued appends. Otherwise epoch 0 is created and made current.
    pub fn open(dir: &Path) -> Result<Self, WalError> {
        fs::create_dir_all(dir)?;

        let current_path = dir.join(CURRENT_FILE);
        let number = if current_path.exists() {
            let contents = fs::read_to_string(&current_path)?;
            contents
                .trim()
                .parse::<u64>()
                .map_err(|_| WalError::Internal("malformed CURRENT pointer".into()))?
        } else {
            write_current_pointer(dir, 0)?;
            0
        };

        let wal = Wal::open(dir, number)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            current_number: AtomicU64::new(number),
            current: Mutex::new(Arc::new(wal)),
        })
    }

    /// Returns a handle to the currently active WAL.
    pub fn current(&self) -> Arc<Wal> {
        Arc::clone(
            &self
                .current
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Closes the current file, opens the next epoch, updates `CURRENT`, and
    /// returns the number of the epoch that was just retired.
    pub fn rotate(&self) -> Result<u64, WalError> {
        let mut guard = self
            .current
            .lock()
            .map_err(|_| WalError::Internal("mutex poisoned".into()))?;

        let retiring = self.current_number.load(Ordering::SeqCst);
        guard.sync()?;

        let next = retiring
            .checked_add(1)
            .ok_or_else(|| WalError::Internal("WAL epoch overflow".into()))?;
        let new_wal = Wal::open(&self.dir, next)?;
        write_current_pointer(&self.dir, next)?;
        self.current_number.store(next, Ordering::SeqCst);
        *guard = Arc::new(new_wal);

        debug!(retired = retiring, next, "WAL rotated");
        Ok(retiring)
    }

    /// Removes the WAL file for a retired epoch (its MemTable has flushed).
    pub fn delete(&self, number: u64) -> Result<(), WalError> {
        let path = wal_path(&self.dir, number);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(number, "WAL file deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WalError::Io(e)),
        }
    }

    /// Enumerates every `*.wal` file in ascending epoch order and returns
    /// their concatenated, decoded record stream alongside the epoch each
    /// record came from.
    pub fn recover_all(&self) -> Result<Vec<(u64, WalRecord)>, WalError> {
        let mut numbers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(n) = parse_wal_number(&entry.path()) {
                numbers.push(n);
            }
        }
        numbers.sort_unstable();

        let mut out = Vec::new();
        for number in numbers {
            let wal = Wal::open(&self.dir, number)?;
            for record in wal.iter()? {
                out.push((number, record));
            }
        }
        info!(records = out.len(), "WAL recovery scan complete");
        Ok(out)
    }
}

fn write_current_pointer(dir: &Path, number: u64) -> Result<(), WalError> {
    let tmp_path = dir.join(format!("{CURRENT_FILE}.tmp"));
    let final_path = dir.join(CURRENT_FILE);
    fs::write(&tmp_path, number.to_string())?;
    fs::rename(&tmp_path, &final_path)?;
    if let Ok(dir_handle) = File::open(dir) {
        let _ = dir_handle.sync_all();
    }
    Ok(())
}
