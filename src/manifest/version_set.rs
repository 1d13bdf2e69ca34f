//! `VersionSet`: owns the manifest log and publishes the current `Version`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use super::edit::VersionEdit;
use super::version::Version;
use super::ManifestError;

const CURRENT_FILE: &str = "CURRENT";
const CURRENT_TMP_SUFFIX: &str = ".tmp";
const MANIFEST_PREFIX: &str = "MANIFEST-";

fn manifest_file_name(number: u64) -> String {
    format!("{MANIFEST_PREFIX}{number:06}")
}

fn parse_manifest_file_name(name: &str) -> Option<u64> {
    name.strip_prefix(MANIFEST_PREFIX)?.parse().ok()
}

/// Owns `CURRENT`, the active `MANIFEST-<n>` file, and the published
/// [`Version`]. `log_and_apply` is the single mutator; every other method
/// is a read against the published snapshot or an atomic counter.
pub struct VersionSet {
    root: PathBuf,
    manifest_number: u64,
    manifest_file: Mutex<File>,
    current: RwLock<Arc<Version>>,
    /// Serializes `log_and_apply` calls so the manifest file and the
    /// `current` pointer move together.
    commit_lock: Mutex<()>,
    next_file_number: AtomicU64,
    last_sequence: AtomicI64,
}

impl VersionSet {
    /// Opens the version set rooted at `root` (a table's root directory,
    /// the same directory that holds `schema.json`). Creates a fresh
    /// manifest if `CURRENT` is absent; otherwise replays the named
    /// manifest to rebuild the current `Version`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let current_path = root.join(CURRENT_FILE);
        if current_path.exists() {
            Self::recover(root, &current_path)
        } else {
            Self::create_new(root)
        }
    }

    fn create_new(root: PathBuf) -> Result<Self, ManifestError> {
        let manifest_number = 1u64;
        let manifest_path = root.join(manifest_file_name(manifest_number));

        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&manifest_path)?;

        let initial_edit = VersionEdit::new().with_next_file_number(2).with_last_sequence(0);
        initial_edit.write_framed(&mut file)?;
        file.sync_all()?;

        Self::write_current(&root, manifest_number)?;

        info!("Created new manifest {:?}", manifest_path);

        Ok(VersionSet {
            root,
            manifest_number,
            manifest_file: Mutex::new(file),
            current: RwLock::new(Arc::new(Version::empty())),
            commit_lock: Mutex::new(()),
            next_file_number: AtomicU64::new(2),
            last_sequence: AtomicI64::new(0),
        })
    }

    fn recover(root: PathBuf, current_path: &Path) -> Result<Self, ManifestError> {
        let pointer = fs::read_to_string(current_path)?;
        let manifest_name = pointer.trim();
        let manifest_number = parse_manifest_file_name(manifest_name)
            .ok_or_else(|| ManifestError::InvalidCurrent(manifest_name.to_string()))?;

        let manifest_path = root.join(manifest_name);
        let read_file = File::open(&manifest_path)?;
        let mut reader = BufReader::new(read_file);

        let mut version = Version::empty();
        let mut next_file_number = 2u64;
        let mut last_sequence = 0i64;
        let mut edit_count = 0u64;

        while let Some(edit) = VersionEdit::read_framed(&mut reader)? {
            version = version.apply(&edit);
            if let Some(n) = edit.next_file_number {
                next_file_number = next_file_number.max(n);
            }
            if let Some(s) = edit.last_sequence {
                last_sequence = last_sequence.max(s);
            }
            edit_count += 1;
        }

        // Self-healing: a crash could have left `next_file_number` behind
        // the highest file number actually referenced by the version.
        for file in version.all_files() {
            next_file_number = next_file_number.max(file.file_number + 1);
        }

        let append_file = OpenOptions::new().append(true).open(&manifest_path)?;

        info!(
            "Recovered manifest {:?}: {} edits, next_file_number={}, last_sequence={}",
            manifest_path, edit_count, next_file_number, last_sequence
        );

        Ok(VersionSet {
            root,
            manifest_number,
            manifest_file: Mutex::new(append_file),
            current: RwLock::new(Arc::new(version)),
            commit_lock: Mutex::new(()),
            next_file_number: AtomicU64::new(next_file_number),
            last_sequence: AtomicI64::new(last_sequence),
        })
    }

    fn write_current(root: &Path, manifest_number: u64) -> Result<(), ManifestError> {
        let tmp_path = root.join(format!("{CURRENT_FILE}{CURRENT_TMP_SUFFIX}"));
        {
            let mut f = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
            f.write_all(manifest_file_name(manifest_number).as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, root.join(CURRENT_FILE))?;
        Self::fsync_dir(root)?;
        Ok(())
    }

    fn fsync_dir(dir: &Path) -> Result<(), ManifestError> {
        let dir_file = File::open(dir)?;
        dir_file.sync_all()?;
        Ok(())
    }

    /// The currently published snapshot. Cheap — an `Arc` clone under a
    /// read lock.
    pub fn current(&self) -> Arc<Version> {
        self.current.read().expect("VersionSet::current poisoned").clone()
    }

    /// Pre-increments the shared file-number counter, handing out unique
    /// numbers for new SST and manifest files alike.
    pub fn allocate_file_number(&self) -> u64 {
        self.next_file_number.fetch_add(1, Ordering::SeqCst)
    }

    /// The last sequence number observed by any committed edit.
    pub fn last_sequence(&self) -> i64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    /// Records a new last-sequence floor. Never moves the counter
    /// backwards.
    pub fn advance_last_sequence(&self, seq: i64) {
        self.last_sequence.fetch_max(seq, Ordering::SeqCst);
    }

    /// The single mutator. Clones the current `Version`, applies `edit` in
    /// memory, appends the framed edit to the manifest, fsyncs, then
    /// publishes the new `Version`. On a failure to write or fsync, the
    /// published `Version` is left untouched — the caller is responsible
    /// for cleaning up any files it created speculatively for this edit.
    pub fn log_and_apply(&self, edit: VersionEdit) -> Result<Arc<Version>, ManifestError> {
        let _guard = self.commit_lock.lock().map_err(|_| ManifestError::Internal("commit lock poisoned".into()))?;

        let next_version = Arc::new(self.current().apply(&edit));

        {
            let mut file = self.manifest_file.lock().map_err(|_| ManifestError::Internal("manifest file lock poisoned".into()))?;
            edit.write_framed(&mut *file)?;
            file.sync_all()?;
        }

        if let Some(n) = edit.next_file_number {
            self.next_file_number.fetch_max(n, Ordering::SeqCst);
        }
        if let Some(s) = edit.last_sequence {
            self.advance_last_sequence(s);
        }

        *self.current.write().expect("VersionSet::current poisoned") = next_version.clone();
        Ok(next_version)
    }

    /// Path to the directory this version set's manifest lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of the currently active manifest file, for diagnostics.
    pub fn manifest_number(&self) -> u64 {
        self.manifest_number
    }

    /// Flushes the manifest file to durable storage. Called from the
    /// engine's orderly-shutdown path.
    pub fn close(&self) -> Result<(), ManifestError> {
        let file = self.manifest_file.lock().map_err(|_| ManifestError::Internal("manifest file lock poisoned".into()))?;
        file.sync_all()?;
        Ok(())
    }
}
