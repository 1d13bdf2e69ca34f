//! # Manifest Component
//!
//! The **Manifest** is the authoritative catalog of which SST files belong
//! to the table and at which level. It is modeled on LevelDB's `VersionSet`:
//! the durable state is an append-only log of [`VersionEdit`]s written to
//! `MANIFEST-<n>`, and `CURRENT` is a tiny pointer file naming the active
//! manifest. The in-memory projection of that log is a [`Version`] — an
//! immutable, per-level snapshot of live files, replaced (never mutated) on
//! every edit.
//!
//! ## Durability strategy
//!
//! 1. **MANIFEST-<n>** records a sequence of framed edits: `crc32(4) |
//!    length(4) | serialized_edit(length)`, with the edit itself tagged
//!    JSON (`serde_json`) per the on-disk format fixed for this table.
//! 2. **CURRENT** names the active manifest file. It is rewritten via
//!    temp-file + rename so a reader never observes a partially written
//!    name.
//! 3. On startup: if `CURRENT` is absent, a brand-new manifest is created
//!    and seeded with an initial edit recording the starting file-number
//!    and sequence counters. If present, every framed edit in the named
//!    manifest is replayed in order to rebuild the current [`Version`].
//!
//! ## Thread safety
//!
//! The active [`Version`] is held behind an `RwLock<Arc<Version>>` so reads
//! never block on a concurrent mutation; [`VersionSet::log_and_apply`]
//! serializes writers through a dedicated mutex so the manifest file and
//! the version pointer are updated atomically with respect to each other.

#[cfg(test)]
mod tests;

pub mod edit;
pub mod version;
pub mod version_set;

pub use edit::VersionEdit;
pub use version::{FileMetadata, Version};
pub use version_set::VersionSet;

use std::io;
use thiserror::Error;

/// Errors returned by manifest operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The edit payload failed to (de)serialize.
    #[error("edit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A manifest frame's checksum did not match its payload.
    #[error("manifest record checksum mismatch")]
    ChecksumMismatch,

    /// A manifest frame's recorded length didn't fit in the file.
    #[error("truncated manifest record")]
    TruncatedRecord,

    /// `CURRENT` pointed at a manifest file that does not exist, or named
    /// something outside the expected `MANIFEST-<n>` pattern.
    #[error("invalid CURRENT pointer: {0}")]
    InvalidCurrent(String),

    /// Internal invariant violation or poisoned lock.
    #[error("internal manifest error: {0}")]
    Internal(String),
}
