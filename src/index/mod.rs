//! Secondary-index collaborator interface.
//!
//! The full secondary-index subsystem (persisted `idx_<field>.sst` files,
//! query planning against them) is out of scope for this crate — it is
//! consumed only through the narrow [`IndexSink`] trait described in
//! SPEC_FULL §6. This module provides the minimal concrete
//! implementations needed to drive the engine end to end: a no-op default
//! and an in-memory test double.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::schema::FieldValue;

/// Errors raised while feeding or persisting an index.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndexError {
    /// Underlying I/O error persisting the index.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated (poisoned lock, corrupt state).
    #[error("internal index error: {0}")]
    Internal(String),
}

/// Receives `(field_value, seq)` tuples for indexed fields as rows are
/// inserted, and is asked to persist or recover its state alongside the
/// rest of the table's durable files.
pub trait IndexSink: Send + Sync {
    /// Records that `value` occurred at `seq`, for one indexed field.
    fn add(&self, value: &FieldValue, seq: i64) -> Result<(), IndexError>;

    /// Persists accumulated index state. Invoked from the flush commit
    /// path, analogous to a MANIFEST commit for data files.
    fn persist(&self) -> Result<(), IndexError>;

    /// Reconstructs index state from durable storage. Invoked once at
    /// table open, after SSTable recovery.
    fn recover(&self) -> Result<(), IndexError>;
}

/// The default sink for tables with no indexed fields: every call is a
/// no-op.
#[derive(Debug, Default)]
pub struct NullIndexSink;

impl IndexSink for NullIndexSink {
    fn add(&self, _value: &FieldValue, _seq: i64) -> Result<(), IndexError> {
        Ok(())
    }

    fn persist(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn recover(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// An in-memory test double: keeps every `(value, seq)` pair it has seen,
/// grouped by a stable string key derived from the field value. `persist`
/// and `recover` are no-ops — there is nothing durable to reload, so tests
/// exercise `add` behavior directly rather than a round trip through disk.
#[derive(Default)]
pub struct MemoryIndexSink {
    entries: Mutex<BTreeMap<String, Vec<i64>>>,
}

impl MemoryIndexSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence numbers recorded against a given field value, in insertion
    /// order.
    pub fn seqs_for(&self, value: &FieldValue) -> Vec<i64> {
        self.entries
            .lock()
            .expect("MemoryIndexSink poisoned")
            .get(&index_key(value))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of `add` calls recorded so far.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("MemoryIndexSink poisoned").values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn index_key(value: &FieldValue) -> String {
    format!("{value:?}")
}

impl IndexSink for MemoryIndexSink {
    fn add(&self, value: &FieldValue, seq: i64) -> Result<(), IndexError> {
        self.entries
            .lock()
            .map_err(|_| IndexError::Internal("poisoned lock".into()))?
            .entry(index_key(value))
            .or_default()
            .push(seq);
        Ok(())
    }

    fn persist(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn recover(&self) -> Result<(), IndexError> {
        Ok(())
    }
}
