//! Four-stage rotating compaction scheduler.

use std::sync::{Arc, Mutex};

use crate::manifest::{FileMetadata, Version};

use super::task::Task;
use super::{level_limit, LARGE_FILE_THRESHOLD};

/// Picks bounded batches of work per call, rotating through four stages
/// (L0 merge, L0 upgrade, L1 upgrade, L2 upgrade) so every level gets
/// visited over a bounded number of calls, regardless of whether any
/// individual stage finds work to do.
pub struct Picker {
    stage: Mutex<u8>,
}

impl Default for Picker {
    fn default() -> Self {
        Self::new()
    }
}

impl Picker {
    pub fn new() -> Self {
        Self { stage: Mutex::new(0) }
    }

    /// Returns the tasks for exactly one stage and advances the stage
    /// counter modulo 4, even if that stage produced no tasks.
    pub fn pick_compaction(&self, version: &Version) -> Vec<Task> {
        let mut stage = self.stage.lock().expect("picker stage lock poisoned");
        let current = *stage;
        *stage = (current + 1) % 4;
        drop(stage);

        Self::pick_stage(current, version)
    }

    /// Peeks across all four stages without mutating the stage counter —
    /// `true` if any stage currently has work.
    pub fn should_compact(&self, version: &Version) -> bool {
        (0..4).any(|stage| !Self::pick_stage(stage, version).is_empty())
    }

    fn pick_stage(stage: u8, version: &Version) -> Vec<Task> {
        match stage {
            0 => stage0_l0_merge(version.files_at(0)),
            1 => stage1_l0_upgrade(version.files_at(0)),
            2 => accumulate_upgrade(version.files_at(1), 1, 2),
            _ => accumulate_upgrade(version.files_at(2), 2, 3),
        }
    }
}

fn sorted_by_min_key(files: &[Arc<FileMetadata>]) -> Vec<Arc<FileMetadata>> {
    let mut files = files.to_vec();
    files.sort_by_key(|f| f.min_key);
    files
}

/// Stage 0: merge contiguous runs of small L0 files once their combined
/// size reaches the L0 limit. Large files are left untouched for Stage 1.
fn stage0_l0_merge(l0: &[Arc<FileMetadata>]) -> Vec<Task> {
    let files = sorted_by_min_key(l0);
    let mut tasks = Vec::new();
    let mut batch: Vec<Arc<FileMetadata>> = Vec::new();
    let mut batch_size = 0u64;

    for file in files {
        if file.size >= LARGE_FILE_THRESHOLD {
            if batch.len() >= 2 {
                tasks.push(make_task(0, std::mem::take(&mut batch), 0, true));
            } else {
                batch.clear();
            }
            batch_size = 0;
            continue;
        }

        batch_size += file.size;
        batch.push(file);

        if batch_size >= level_limit(0) {
            tasks.push(make_task(0, std::mem::take(&mut batch), 0, true));
            batch_size = 0;
        }
    }

    if batch.len() >= 2 {
        tasks.push(make_task(0, batch, 0, true));
    }

    tasks
}

/// Stage 1: for each large L0 file not yet claimed by an earlier center in
/// this call, build a batch around it — absorb every unprocessed
/// contiguous left neighbor unconditionally, then extend rightward while
/// the running total stays within the L1 limit.
fn stage1_l0_upgrade(l0: &[Arc<FileMetadata>]) -> Vec<Task> {
    let files = sorted_by_min_key(l0);
    let mut consumed = vec![false; files.len()];
    let mut tasks = Vec::new();

    for i in 0..files.len() {
        if consumed[i] || files[i].size < LARGE_FILE_THRESHOLD {
            continue;
        }

        let mut batch = vec![files[i].clone()];
        consumed[i] = true;
        let mut total = files[i].size;

        let mut left = i;
        while left > 0 && !consumed[left - 1] {
            left -= 1;
            consumed[left] = true;
            total += files[left].size;
            batch.insert(0, files[left].clone());
        }

        let mut right = i;
        while right + 1 < files.len() && !consumed[right + 1] && total + files[right + 1].size <= level_limit(1) {
            right += 1;
            consumed[right] = true;
            total += files[right].size;
            batch.push(files[right].clone());
        }

        tasks.push(make_task(0, batch, 1, false));
    }

    tasks
}

/// Stages 2 and 3: walk a level's files in key order, accumulating a
/// batch until it reaches that level's size limit; emit one task per
/// completed batch. A residual below the limit is left for next time.
fn accumulate_upgrade(files: &[Arc<FileMetadata>], source_level: usize, output_level: usize) -> Vec<Task> {
    let files = sorted_by_min_key(files);
    let mut tasks = Vec::new();
    let mut batch: Vec<Arc<FileMetadata>> = Vec::new();
    let mut total = 0u64;

    for file in files {
        total += file.size;
        batch.push(file);
        if total >= level_limit(source_level) {
            tasks.push(make_task(source_level, std::mem::take(&mut batch), output_level, false));
            total = 0;
        }
    }

    tasks
}

fn make_task(source_level: usize, input_files: Vec<Arc<FileMetadata>>, output_level: usize, level_is_advisory: bool) -> Task {
    Task { source_level, input_files, output_level, level_is_advisory }
}

/// Given the resulting file size and the level it was compacted from,
/// decides the level to publish it at: stays put if the size fits within
/// 1.2x that level's limit, otherwise walks upward, capping at L3.
pub fn determine_level(source_level: usize, file_size: u64) -> usize {
    let mut level = source_level;
    while level < 3 {
        let target = (level_limit(level) as f64) * 1.2;
        if (file_size as f64) <= target {
            return level;
        }
        level += 1;
    }
    3
}
