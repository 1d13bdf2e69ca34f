//! Background sweep of `*.sst` files no longer referenced by the current
//! [`Version`].

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::warn;

use crate::manifest::Version;
use crate::sstable::parse_sst_file_name;

/// Default minimum age before an unreferenced file is eligible for
/// removal — long enough to avoid racing with an in-flight MANIFEST
/// commit that hasn't registered the file yet.
pub const DEFAULT_FILE_MIN_AGE: Duration = Duration::from_secs(60);

/// Periodically cross-checks physical `*.sst` files against the current
/// `Version` and unlinks anything unreferenced and old enough.
pub struct GarbageCollector {
    sst_dir: PathBuf,
    file_min_age: Duration,
    orphans_swept: AtomicU64,
    last_sweep: Mutex<Option<SystemTime>>,
}

impl GarbageCollector {
    pub fn new(sst_dir: PathBuf) -> Self {
        Self::with_min_age(sst_dir, DEFAULT_FILE_MIN_AGE)
    }

    pub fn with_min_age(sst_dir: PathBuf, file_min_age: Duration) -> Self {
        Self { sst_dir, file_min_age, orphans_swept: AtomicU64::new(0), last_sweep: Mutex::new(None) }
    }

    /// Removes every `*.sst` file in the data directory that is not
    /// referenced by `version` and is at least `file_min_age` old.
    /// Returns the number of files removed.
    pub fn sweep(&self, version: &Version) -> std::io::Result<usize> {
        let live: HashSet<u64> = version.all_files().iter().map(|f| f.file_number).collect();
        let mut swept = 0usize;

        let entries = match fs::read_dir(&self.sst_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                *self.last_sweep.lock().expect("gc last_sweep poisoned") = Some(SystemTime::now());
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(number) = parse_sst_file_name(&name.to_string_lossy()) else { continue };
            if live.contains(&number) {
                continue;
            }

            let age = entry.metadata().and_then(|m| m.modified()).ok().and_then(|t| t.elapsed().ok()).unwrap_or(Duration::ZERO);
            if age < self.file_min_age {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => swept += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(file = %entry.path().display(), error = %e, "garbage collector: failed to remove orphan"),
            }
        }

        self.orphans_swept.fetch_add(swept as u64, Ordering::Relaxed);
        *self.last_sweep.lock().expect("gc last_sweep poisoned") = Some(SystemTime::now());
        Ok(swept)
    }

    pub fn orphans_swept(&self) -> u64 {
        self.orphans_swept.load(Ordering::Relaxed)
    }

    pub fn last_sweep(&self) -> Option<SystemTime> {
        *self.last_sweep.lock().expect("gc last_sweep poisoned")
    }
}
