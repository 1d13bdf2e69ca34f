//! # Compaction
//!
//! Background maintenance for the leveled file layout: merging small
//! files, promoting mature ones to higher levels, and reclaiming disk
//! space left behind by prior compactions or crashes.
//!
//! ## Scheduling
//!
//! [`Picker`] implements a four-stage rotating scheduler over levels
//! L0..L3. Each call to `pick_compaction` advances an internal stage
//! counter modulo 4 and returns the [`Task`]s for exactly one stage,
//! guaranteeing every level is revisited within a bounded number of
//! cycles.
//!
//! ## Execution
//!
//! [`Compactor`] executes one `Task`: read the surviving input files and
//! any overlapping files at the output level, merge by sequence number
//! (keeping the row with the greater `time` on a duplicate `seq`), write
//! one output file, and produce a [`crate::manifest::VersionEdit`]
//! describing the change. [`CompactionManager`] owns the background
//! loops that drive the picker and compactor, and a second loop that
//! sweeps orphaned `*.sst` files ([`gc::GarbageCollector`]).

#[cfg(test)]
mod tests;

pub mod compactor;
pub mod gc;
pub mod manager;
pub mod picker;
pub mod task;

pub use compactor::Compactor;
pub use gc::GarbageCollector;
pub use manager::CompactionManager;
pub use picker::Picker;
pub use task::Task;

use std::io;
use thiserror::Error;

/// Per-level size limits, in bytes, used by both the picker and
/// `determine_level`.
pub const L0_LIMIT: u64 = 64 * 1024 * 1024;
pub const L1_LIMIT: u64 = 256 * 1024 * 1024;
pub const L2_LIMIT: u64 = 512 * 1024 * 1024;
pub const L3_LIMIT: u64 = 1024 * 1024 * 1024;

/// Files at or above this size are handled by Stage 1 rather than being
/// folded into an L0 merge batch.
pub const LARGE_FILE_THRESHOLD: u64 = 32 * 1024 * 1024;

pub(crate) fn level_limit(level: usize) -> u64 {
    match level {
        0 => L0_LIMIT,
        1 => L1_LIMIT,
        2 => L2_LIMIT,
        _ => L3_LIMIT,
    }
}

/// Errors returned by compaction operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompactionError {
    #[error("SSTable error: {0}")]
    SSTable(#[from] crate::sstable::SSTableError),

    #[error("manifest error: {0}")]
    Manifest(#[from] crate::manifest::ManifestError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("internal compaction error: {0}")]
    Internal(String),
}
