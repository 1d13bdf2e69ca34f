//! A unit of compaction work selected by the [`super::Picker`].

use std::sync::Arc;

use crate::manifest::FileMetadata;

/// One compaction task: merge `input_files` (all currently at
/// `source_level`) and write the result at `output_level`.
#[derive(Debug, Clone)]
pub struct Task {
    pub source_level: usize,
    pub input_files: Vec<Arc<FileMetadata>>,
    pub output_level: usize,
    /// `true` only for Stage 0 tasks, where `output_level` is a hint and
    /// the compactor re-derives the real level from the resulting file
    /// size via `determine_level`. Binding for every other stage.
    pub level_is_advisory: bool,
}

impl Task {
    pub fn total_input_size(&self) -> u64 {
        self.input_files.iter().map(|f| f.size).sum()
    }

    pub fn input_file_numbers(&self) -> Vec<u64> {
        self.input_files.iter().map(|f| f.file_number).collect()
    }
}
