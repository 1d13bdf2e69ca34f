//! Orchestrates the picker, compactor, and garbage collector as two
//! background loops.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{tick, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::manifest::VersionSet;
use crate::sstable::SSTableManager;

use super::compactor::Compactor;
use super::gc::GarbageCollector;
use super::picker::Picker;
use super::CompactionError;

const MAX_CONSECUTIVE_FAILURES: u32 = 3;
const DEFAULT_COMPACTION_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(30);

/// Owns the compaction machinery for one table: a single execution mutex
/// so only one cycle runs at a time, a per-file consecutive-failure
/// counter used for retry back-off, and the two background loops
/// (compaction, garbage collection).
pub struct CompactionManager {
    sst_manager: Arc<SSTableManager>,
    version_set: Arc<VersionSet>,
    picker: Picker,
    compactor: Compactor,
    gc: GarbageCollector,
    exec_lock: Mutex<()>,
    failures: Mutex<HashMap<u64, u32>>,
    compaction_interval: Duration,
    gc_interval: Duration,
    stop_tx: Mutex<Option<Sender<()>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl CompactionManager {
    pub fn new(sst_manager: Arc<SSTableManager>, version_set: Arc<VersionSet>, sst_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            sst_manager,
            version_set,
            picker: Picker::new(),
            compactor: Compactor,
            gc: GarbageCollector::new(sst_dir),
            exec_lock: Mutex::new(()),
            failures: Mutex::new(HashMap::new()),
            compaction_interval: DEFAULT_COMPACTION_INTERVAL,
            gc_interval: DEFAULT_GC_INTERVAL,
            stop_tx: Mutex::new(None),
            threads: Mutex::new(Vec::new()),
        })
    }

    /// Runs one GC pass synchronously and starts the two background
    /// loops. The startup sweep catches orphans left by a prior crash
    /// before normal operation begins.
    pub fn start(self: &Arc<Self>) {
        if let Err(e) = self.gc.sweep(&self.version_set.current()) {
            warn!(error = %e, "compaction manager: startup GC sweep failed");
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        *self.stop_tx.lock().expect("stop_tx poisoned") = Some(tx);

        let compaction_handle = {
            let manager = Arc::clone(self);
            let rx = rx.clone();
            std::thread::spawn(move || manager.compaction_loop(rx))
        };
        let gc_handle = {
            let manager = Arc::clone(self);
            std::thread::spawn(move || manager.gc_loop(rx))
        };

        let mut threads = self.threads.lock().expect("threads poisoned");
        threads.push(compaction_handle);
        threads.push(gc_handle);
    }

    /// Signals both background loops to stop and waits for them to exit.
    pub fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().expect("stop_tx poisoned").take() {
            drop(tx);
        }
        let mut threads = self.threads.lock().expect("threads poisoned");
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
    }

    fn compaction_loop(&self, stop_rx: Receiver<()>) {
        let ticker = tick(self.compaction_interval);
        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if let Err(e) = self.run_cycle() {
                        error!(error = %e, "compaction cycle failed");
                    }
                }
            }
        }
    }

    fn gc_loop(&self, stop_rx: Receiver<()>) {
        let ticker = tick(self.gc_interval);
        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    match self.gc.sweep(&self.version_set.current()) {
                        Ok(n) if n > 0 => info!(swept = n, "garbage collector: removed orphaned files"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "garbage collector: sweep failed"),
                    }
                }
            }
        }
    }

    /// Runs one full cycle: stage 0 through stage 3, tasks within a stage
    /// scheduled concurrently, stages run serially because each depends
    /// on the `Version` produced by the one before it. Blocks if another
    /// cycle is already running.
    pub fn run_cycle(&self) -> Result<(), CompactionError> {
        let _guard = self.exec_lock.lock().map_err(|_| CompactionError::Internal("exec lock poisoned".into()))?;
        self.run_cycle_locked()
    }

    /// Non-blocking variant: returns `false` immediately if a cycle is
    /// already in progress instead of waiting for it.
    pub fn try_run_cycle(&self) -> bool {
        match self.exec_lock.try_lock() {
            Ok(_guard) => {
                if let Err(e) = self.run_cycle_locked() {
                    error!(error = %e, "compaction cycle failed");
                }
                true
            }
            Err(_) => false,
        }
    }

    fn run_cycle_locked(&self) -> Result<(), CompactionError> {
        for _ in 0..4 {
            let version = self.version_set.current();
            let tasks = self.picker.pick_compaction(&version);
            if tasks.is_empty() {
                continue;
            }

            let runnable: Vec<_> = tasks
                .into_iter()
                .filter(|task| {
                    let failures = self.failures.lock().expect("failures poisoned");
                    !task.input_file_numbers().iter().any(|n| failures.get(n).copied().unwrap_or(0) >= MAX_CONSECUTIVE_FAILURES)
                })
                .collect();

            if runnable.is_empty() {
                continue;
            }

            let results: Vec<Result<(), CompactionError>> = crossbeam::thread::scope(|scope| {
                let handles: Vec<_> = runnable
                    .iter()
                    .map(|task| scope.spawn(|_| self.execute_task(task, &version)))
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap_or_else(|_| Err(CompactionError::Internal("compaction task panicked".into())))).collect()
            })
            .map_err(|_| CompactionError::Internal("compaction scope panicked".into()))?;

            for (task, result) in runnable.iter().zip(results) {
                if let Err(e) = result {
                    warn!(error = %e, source_level = task.source_level, "compaction task failed");
                    let mut failures = self.failures.lock().expect("failures poisoned");
                    for number in task.input_file_numbers() {
                        *failures.entry(number).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn execute_task(&self, task: &super::task::Task, version: &crate::manifest::Version) -> Result<(), CompactionError> {
        let outcome = match self.compactor.do_compaction(task, &self.sst_manager, &self.version_set, version)? {
            Some(outcome) => outcome,
            None => return Ok(()),
        };

        match self.version_set.log_and_apply(outcome.edit) {
            Ok(_) => {
                self.sst_manager.add_reader(outcome.new_reader);
                for number in &outcome.deleted_file_numbers {
                    self.sst_manager.remove_reader(*number);
                    if let Err(e) = self.sst_manager.delete_file(*number) {
                        warn!(file_number = number, error = %e, "compaction: failed to remove consumed file");
                    }
                }
                let mut failures = self.failures.lock().expect("failures poisoned");
                for number in task.input_file_numbers() {
                    failures.remove(&number);
                }
                debug!(new_file = outcome.new_file_number, source_level = task.source_level, "compaction task committed");
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup_err) = self.sst_manager.delete_file(outcome.new_file_number) {
                    warn!(file_number = outcome.new_file_number, error = %cleanup_err, "compaction: failed to clean up orphaned output after manifest failure");
                }
                Err(CompactionError::Manifest(e))
            }
        }
    }

    pub fn orphans_swept(&self) -> u64 {
        self.gc.orphans_swept()
    }
}
