//! `Version`: an immutable, per-level snapshot of live SST files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::edit::VersionEdit;

/// Number of levels this table's compaction scheme recognizes (L0..L3).
pub const NUM_LEVELS: usize = 4;

/// Metadata for one SST file as tracked by the manifest. This is a
/// lightweight catalog entry, distinct from the `SstReader` that actually
/// opens and mmaps the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// File number; the on-disk name is `sst/<file_number:06>.sst`.
    pub file_number: u64,
    /// Level this file currently lives at (0..NUM_LEVELS).
    pub level: u32,
    /// File size in bytes, as observed at commit time.
    pub size: u64,
    /// Smallest sequence number stored in the file.
    pub min_key: i64,
    /// Largest sequence number stored in the file.
    pub max_key: i64,
    /// Number of rows stored in the file.
    pub row_count: u64,
}

/// An immutable snapshot of which files exist at which level.
///
/// `apply` never mutates an existing `Version` in place — it produces a new
/// one by cloning the per-level lists and applying the edit's adds/deletes.
/// Older snapshots remain valid for any reader still holding an `Arc` to
/// them; this is what lets scans and compactions proceed against a
/// consistent view while writers move on.
#[derive(Debug, Clone, Default)]
pub struct Version {
    levels: [Vec<Arc<FileMetadata>>; NUM_LEVELS],
}

impl Version {
    /// A version with no files at any level, the starting point for a
    /// brand-new table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Files at `level`, in no particular order.
    pub fn files_at(&self, level: usize) -> &[Arc<FileMetadata>] {
        &self.levels[level]
    }

    /// All files across every level.
    pub fn all_files(&self) -> Vec<Arc<FileMetadata>> {
        self.levels.iter().flatten().cloned().collect()
    }

    /// Total size in bytes of all files at `level`.
    pub fn level_size(&self, level: usize) -> u64 {
        self.levels[level].iter().map(|f| f.size).sum()
    }

    /// `true` if no level holds any file.
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// The largest sequence number covered by any file, or `-1` if empty.
    pub fn max_seq(&self) -> i64 {
        self.all_files().iter().map(|f| f.max_key).max().unwrap_or(-1)
    }

    /// Produces the next `Version` by applying `edit`'s deletes, then adds,
    /// to a clone of the current per-level lists.
    pub fn apply(&self, edit: &VersionEdit) -> Version {
        let mut levels = self.levels.clone();

        if !edit.deleted_files.is_empty() {
            for level in levels.iter_mut() {
                level.retain(|f| !edit.deleted_files.contains(&f.file_number));
            }
        }

        for added in &edit.added_files {
            let level = added.level as usize;
            if level < NUM_LEVELS
                && !levels[level].iter().any(|f| f.file_number == added.file_number)
            {
                levels[level].push(Arc::new(added.clone()));
            }
        }

        Version { levels }
    }
}
