//! MemTable — in-memory write buffer
//!
//! `MemTable` is a `seq -> row bytes` map backed by a [`Wal`] for durability.
//! Because the engine is append-only, a `seq` is only ever written once; there
//! is no tombstone or overwrite machinery here — that's the whole point of
//! the port away from the teacher's multi-version, delete-aware design.
//!
//! `MemTableManager` holds one writable Active table plus a FIFO of
//! Immutable tables awaiting flush, allowing flushes to pipeline behind new
//! writes.

#[cfg(test)]
mod tests;

use std::{
    collections::{BTreeMap, VecDeque},
    path::Path,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, RwLock,
    },
};

use crate::wal::{Wal, WalError, WalManager, WalRecord};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors returned by [`MemTable`] and [`MemTableManager`] operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MemTableError {
    /// Underlying WAL I/O failure.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// Write buffer limit reached; the caller must switch to a fresh Active
    /// table before the write can proceed.
    #[error("flush required: active memtable is at capacity")]
    FlushRequired,

    /// Internal invariant violation or poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The mutable, in-memory write buffer of a single WAL epoch.
pub struct MemTable {
    rows: RwLock<BTreeMap<i64, Vec<u8>>>,
    size: AtomicI64,
    write_buffer_size: usize,
    wal: Arc<Wal>,
}

impl MemTable {
    /// Creates an empty `MemTable` backed by `wal`.
    pub fn new(wal: Arc<Wal>, write_buffer_size: usize) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            size: AtomicI64::new(0),
            write_buffer_size,
            wal,
        }
    }

    /// Rebuilds a `MemTable` by replaying every record in `wal`.
    ///
    /// Returns the table and the highest `seq` observed, if any.
    pub fn recover(wal: Arc<Wal>, write_buffer_size: usize) -> Result<(Self, Option<i64>), MemTableError> {
        let table = Self::new(Arc::clone(&wal), write_buffer_size);
        let mut max_seq = None;

        let mut rows = table.rows.write().map_err(poison)?;
        let mut size = 0i64;
        for record in wal.iter()? {
            size += (8 + record.payload.len()) as i64;
            max_seq = Some(max_seq.map_or(record.seq, |m: i64| m.max(record.seq)));
            rows.insert(record.seq, record.payload);
        }
        drop(rows);
        table.size.store(size, Ordering::SeqCst);

        debug!(rows = table.rows.read().map_err(poison)?.len(), wal = wal.number(), "memtable recovered from WAL");
        Ok((table, max_seq))
    }

    /// Inserts `bytes` at `seq`, writing through to the WAL first.
    pub fn put(&self, seq: i64, bytes: Vec<u8>) -> Result<(), MemTableError> {
        let incoming_size = (8 + bytes.len()) as i64;
        if self.size.load(Ordering::SeqCst) + incoming_size > self.write_buffer_size as i64 {
            return Err(MemTableError::FlushRequired);
        }

        self.wal.append(&WalRecord::put(seq, bytes.clone()))?;

        let mut rows = self.rows.write().map_err(poison)?;
        rows.insert(seq, bytes);
        self.size.fetch_add(incoming_size, Ordering::SeqCst);

        trace!(seq, "memtable put");
        Ok(())
    }

    /// Returns the stored bytes for `seq`, if present.
    pub fn get(&self, seq: i64) -> Result<Option<Vec<u8>>, MemTableError> {
        let rows = self.rows.read().map_err(poison)?;
        Ok(rows.get(&seq).cloned())
    }

    /// Cumulative byte size of WAL-framed records written so far.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst).max(0) as usize
    }

    /// Returns `true` once [`Self::size`] has reached the configured threshold.
    pub fn should_switch(&self) -> bool {
        self.size() >= self.write_buffer_size
    }

    /// A defensive copy of the sorted sequence-number keys.
    pub fn keys(&self) -> Result<Vec<i64>, MemTableError> {
        let rows = self.rows.read().map_err(poison)?;
        Ok(rows.keys().copied().collect())
    }

    /// Yields `(seq, bytes)` pairs in ascending sequence order.
    pub fn iter(&self) -> Result<Vec<(i64, Vec<u8>)>, MemTableError> {
        let rows = self.rows.read().map_err(poison)?;
        Ok(rows.iter().map(|(k, v)| (*k, v.clone())).collect())
    }

    /// The WAL epoch backing this table.
    pub fn wal_number(&self) -> u64 {
        self.wal.number()
    }
}

fn poison<T>(_: std::sync::PoisonError<T>) -> MemTableError {
    MemTableError::Internal("lock poisoned".into())
}

/// Handle to a frozen (read-only, pending-flush) MemTable in the Immutable
/// FIFO.
pub struct ImmutableHandle {
    pub table: Arc<MemTable>,
}

/// Owns the Active/Immutable split and the write-buffer-size policy.
pub struct MemTableManager {
    wal_manager: Arc<WalManager>,
    active: RwLock<Arc<MemTable>>,
    immutables: Mutex<VecDeque<Arc<MemTable>>>,
    write_buffer_size: usize,
}

impl MemTableManager {
    /// Opens the WAL directory under `dir`, replays every epoch, and
    /// reconstructs the Active/Immutable split: the newest WAL epoch becomes
    /// Active, every older one becomes an already-frozen Immutable.
    pub fn open<P: AsRef<Path>>(dir: P, write_buffer_size: usize) -> Result<(Self, Option<i64>), MemTableError> {
        let wal_manager = Arc::new(WalManager::open(dir.as_ref())?);

        let mut by_epoch: BTreeMap<u64, Vec<WalRecord>> = BTreeMap::new();
        for (epoch, record) in wal_manager.recover_all()? {
            by_epoch.entry(epoch).or_default().push(record);
        }

        let mut max_seq: Option<i64> = None;
        let mut immutables = VecDeque::new();
        let mut epochs: Vec<u64> = by_epoch.keys().copied().collect();
        epochs.sort_unstable();

        let current_epoch = wal_manager.current().number();

        for epoch in &epochs {
            if *epoch == current_epoch {
                continue;
            }
            let wal = Arc::new(Wal::open(dir.as_ref(), *epoch)?);
            let (table, epoch_max) = MemTable::recover(wal, write_buffer_size)?;
            if let Some(m) = epoch_max {
                max_seq = Some(max_seq.map_or(m, |cur| cur.max(m)));
            }
            immutables.push_back(Arc::new(table));
        }

        let (active, active_max) = MemTable::recover(wal_manager.current(), write_buffer_size)?;
        if let Some(m) = active_max {
            max_seq = Some(max_seq.map_or(m, |cur| cur.max(m)));
        }

        info!(
            immutables = immutables.len(),
            active_wal = active.wal_number(),
            "memtable manager recovered"
        );

        Ok((
            Self {
                wal_manager,
                active: RwLock::new(Arc::new(active)),
                immutables: Mutex::new(immutables),
                write_buffer_size,
            },
            max_seq,
        ))
    }

    /// Routes the write to the Active table.
    pub fn put(&self, seq: i64, bytes: Vec<u8>) -> Result<(), MemTableError> {
        let active = self.active.read().map_err(poison)?.clone();
        active.put(seq, bytes)
    }

    /// Returns the value for `seq` from Active, then Immutable (newest first).
    pub fn get(&self, seq: i64) -> Result<Option<Vec<u8>>, MemTableError> {
        let active = self.active.read().map_err(poison)?.clone();
        if let Some(v) = active.get(seq)? {
            return Ok(Some(v));
        }
        let immutables = self.immutables.lock().map_err(poison)?;
        for table in immutables.iter().rev() {
            if let Some(v) = table.get(seq)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// `true` once the Active table has reached its size threshold.
    pub fn should_switch(&self) -> Result<bool, MemTableError> {
        Ok(self.active.read().map_err(poison)?.should_switch())
    }

    /// Freezes Active into a new Immutable, installs a fresh Active backed by
    /// a newly rotated WAL epoch, and returns the handle to the freshly
    /// frozen table for the flush path.
    pub fn switch(&self) -> Result<(u64, ImmutableHandle), MemTableError> {
        let retired_epoch = self.wal_manager.rotate()?;
        let new_wal = self.wal_manager.current();
        let new_active = Arc::new(MemTable::new(new_wal, self.write_buffer_size));

        let mut active_guard = self.active.write().map_err(poison)?;
        let frozen = std::mem::replace(&mut *active_guard, new_active);
        drop(active_guard);

        self.immutables
            .lock()
            .map_err(poison)?
            .push_back(Arc::clone(&frozen));

        debug!(retired_epoch, "memtable switched");
        Ok((retired_epoch, ImmutableHandle { table: frozen }))
    }

    /// Removes a flushed Immutable table from the FIFO and deletes its WAL.
    pub fn remove_immutable(&self, handle: &ImmutableHandle) -> Result<(), MemTableError> {
        let mut immutables = self.immutables.lock().map_err(poison)?;
        immutables.retain(|t| !Arc::ptr_eq(t, &handle.table));
        drop(immutables);
        self.wal_manager.delete(handle.table.wal_number())?;
        Ok(())
    }

    /// Snapshot of Immutable tables, oldest first.
    pub fn immutables(&self) -> Result<Vec<Arc<MemTable>>, MemTableError> {
        Ok(self.immutables.lock().map_err(poison)?.iter().cloned().collect())
    }

    /// A handle to the current Active table, for scanning and recovery-time
    /// validation.
    pub fn active(&self) -> Result<Arc<MemTable>, MemTableError> {
        Ok(self.active.read().map_err(poison)?.clone())
    }

    /// The epoch number of the current Active table's WAL.
    pub fn active_wal_number(&self) -> Result<u64, MemTableError> {
        Ok(self.active.read().map_err(poison)?.wal_number())
    }
}
