//! Executes a single compaction [`Task`] against the current [`Version`].

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::manifest::{FileMetadata, Version, VersionEdit};
use crate::sstable::writer::EncodedRow;
use crate::sstable::{SSTableManager, SstReader};

use super::picker::determine_level;
use super::task::Task;
use super::CompactionError;

/// The outcome of successfully executing one [`Task`]: the edit to commit
/// and the reader for the freshly written file, so the caller can
/// register it with the [`SSTableManager`] once the edit is durable.
pub struct CompactionOutcome {
    pub edit: VersionEdit,
    pub new_reader: Arc<SstReader>,
    pub new_file_number: u64,
    pub deleted_file_numbers: Vec<u64>,
}

#[derive(Default)]
pub struct Compactor;

impl Compactor {
    /// Runs `task` to completion: reads surviving inputs plus any
    /// overlapping files at the output level, merges and de-duplicates by
    /// sequence number, writes one output file, and builds the edit that
    /// publishes it. Returns `Ok(None)` if every input file for this task
    /// has already disappeared (a benign race with a concurrent GC
    /// sweep).
    pub fn do_compaction(
        &self,
        task: &Task,
        sst_manager: &SSTableManager,
        version_set: &crate::manifest::VersionSet,
        version: &Version,
    ) -> Result<Option<CompactionOutcome>, CompactionError> {
        let readers = sst_manager.get_readers();
        let reader_by_number = |number: u64| readers.iter().find(|r| r.file_number() == number).cloned();

        let present_inputs: Vec<Arc<SstReader>> =
            task.input_files.iter().filter_map(|f| reader_by_number(f.file_number)).collect();

        if present_inputs.is_empty() {
            debug!(source_level = task.source_level, "compaction: all input files already gone, skipping");
            return Ok(None);
        }

        let input_min = present_inputs.iter().map(|r| r.min_key()).min().unwrap();
        let input_max = present_inputs.iter().map(|r| r.max_key()).max().unwrap();

        let mut deleted: HashSet<u64> = present_inputs.iter().map(|r| r.file_number()).collect();
        let mut rows: Vec<EncodedRow> = Vec::new();
        for reader in &present_inputs {
            rows.extend(reader.read_all_encoded()?);
        }

        for overlapping in version.files_at(task.output_level) {
            if deleted.contains(&overlapping.file_number) {
                continue;
            }
            if overlapping.min_key > input_max || overlapping.max_key < input_min {
                continue;
            }
            match reader_by_number(overlapping.file_number) {
                Some(reader) => {
                    rows.extend(reader.read_all_encoded()?);
                    deleted.insert(overlapping.file_number);
                }
                None => {
                    // Referenced by the version but missing on disk — a
                    // stale reference from a prior crash. Schedule its
                    // removal without reading anything from it.
                    deleted.insert(overlapping.file_number);
                }
            }
        }

        rows.sort_by(|a, b| a.seq.cmp(&b.seq).then(a.time.cmp(&b.time)));
        let mut merged: Vec<EncodedRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match merged.last_mut() {
                // Ascending (seq, time) order means a later row for the
                // same seq always carries the greater (or equal) time.
                Some(last) if last.seq == row.seq => *last = row,
                _ => merged.push(row),
            }
        }
        let rows = merged;

        let new_file_number = version_set.allocate_file_number();
        let (new_reader, summary) = sst_manager.create_sst(new_file_number, &rows)?;

        let final_level = if task.level_is_advisory {
            determine_level(task.source_level, summary.file_size)
        } else {
            task.output_level
        };

        let metadata = FileMetadata {
            file_number: new_file_number,
            level: final_level as u32,
            size: summary.file_size,
            min_key: summary.min_key,
            max_key: summary.max_key,
            row_count: summary.row_count,
        };

        let deleted_file_numbers: Vec<u64> = deleted.into_iter().collect();
        let mut edit = VersionEdit::new().add_file(metadata).with_next_file_number(new_file_number + 1);
        for number in &deleted_file_numbers {
            edit = edit.delete_file(*number);
        }

        Ok(Some(CompactionOutcome { edit, new_reader, new_file_number, deleted_file_numbers }))
    }
}
