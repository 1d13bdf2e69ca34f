//! # Table Engine
//!
//! [`Engine`] is the outer coordinator: it binds the [`crate::schema`]
//! codec, [`crate::wal`] (via [`crate::memtable::MemTableManager`]),
//! [`crate::memtable`], [`crate::sstable::SSTableManager`],
//! [`crate::manifest::VersionSet`], [`crate::compaction::CompactionManager`]
//! and an [`crate::index::IndexSink`] into a single append-only,
//! crash-recoverable table.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Engine                            │
//! │  ┌────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │  Active     │  │  Immutable   │  │     SSTables      │  │
//! │  │  MemTable   │  │  MemTables   │  │  (L0..L3, mmap)   │  │
//! │  │  + WAL      │  │  + WALs      │  │                   │  │
//! │  └─────┬───────┘  └──────┬───────┘  └─────────┬─────────┘  │
//! │        │    switch       │    flush           │            │
//! │        └──────────►      └───────────►         │            │
//! │                                                │            │
//! │  ┌─────────────────────────────────────────────┘            │
//! │  │  CompactionManager (picker + compactor + GC)             │
//! │  └───────────────────────────────────────────────────────┘  │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │           VersionSet (MANIFEST + CURRENT)             │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes append to the WAL, then the Active MemTable; once it reaches
//! [`EngineConfig::write_buffer_size`] it is switched into an Immutable and
//! flushed to a level-0 SST in the background. An idle table is drained by
//! an auto-flush watchdog after [`EngineConfig::auto_flush_timeout`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use chronodb::engine::{Engine, EngineConfig};
//! use chronodb::schema::{FieldDef, FieldType, FieldValue};
//! use std::collections::BTreeMap;
//!
//! let schema_fields = vec![
//!     FieldDef { name: "id".into(), field_type: FieldType::I64, nullable: false },
//!     FieldDef { name: "name".into(), field_type: FieldType::String, nullable: false },
//! ];
//! let engine = Engine::open("/tmp/my_table", Some(schema_fields), EngineConfig::default()).unwrap();
//!
//! let mut fields = BTreeMap::new();
//! fields.insert("id".to_string(), FieldValue::I64(1));
//! fields.insert("name".to_string(), FieldValue::String("a".into()));
//! let seq = engine.insert(fields).unwrap();
//!
//! let row = engine.get(seq).unwrap().unwrap();
//! assert_eq!(row.fields.get("id"), Some(&FieldValue::I64(1)));
//!
//! engine.close().unwrap();
//! ```

pub mod utils;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{select, tick, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::compaction::CompactionManager;
use crate::index::{IndexError, IndexSink, NullIndexSink};
use crate::manifest::{FileMetadata, ManifestError, VersionEdit, VersionSet};
use crate::memtable::{ImmutableHandle, MemTableError, MemTableManager};
use crate::schema::{FieldValue, Row, Schema, SchemaError};
use crate::sstable::writer::EncodedRow;
use crate::sstable::{SSTableError, SSTableManager};

use utils::{MergeIterator, SeqRecord};

const WAL_DIR: &str = "wal";
const SST_DIR: &str = "sst";
const IDX_DIR: &str = "idx";

/// Default write-buffer size (per Active MemTable) before a switch is
/// triggered: 64 MiB.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Default auto-flush idle timeout (see Open Question 4 in `DESIGN.md`).
pub const DEFAULT_AUTO_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `close`/`clean` will poll for Immutables to drain before giving
/// up and proceeding anyway.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Errors returned by [`Engine`] operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A row failed schema validation, or the table's schema could not be
    /// loaded/persisted.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// MemTable or MemTableManager failure.
    #[error("memtable error: {0}")]
    Memtable(#[from] MemTableError),

    /// SSTable build, open, or lookup failure.
    #[error("SSTable error: {0}")]
    Sstable(#[from] SSTableError),

    /// MANIFEST/VersionSet failure.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Secondary index sink failure.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A table was opened with no `schema.json` present and no schema was
    /// supplied to create one.
    #[error("table has no schema and none was provided")]
    NoSchema,

    /// An operation was attempted after `close`/`destroy`.
    #[error("table is closed")]
    Closed,

    /// Internal invariant violation or poisoned lock.
    #[error("internal engine error: {0}")]
    Internal(String),
}

fn poison<T>(_: PoisonError<T>) -> EngineError {
    EngineError::Internal("lock poisoned".into())
}

/// Tunable knobs for one [`Engine`].
pub struct EngineConfig {
    /// Byte threshold for an Active MemTable before it is switched out.
    pub write_buffer_size: usize,
    /// Idle duration after which the auto-flush watchdog drains a non-empty
    /// Active MemTable.
    pub auto_flush_timeout: Duration,
    /// Sink fed `(field_value, seq)` tuples for every field named in
    /// `indexed_fields`. Defaults to [`NullIndexSink`].
    pub index_sink: Option<Arc<dyn IndexSink>>,
    /// Schema field names to feed into `index_sink` on every insert.
    pub indexed_fields: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            auto_flush_timeout: DEFAULT_AUTO_FLUSH_TIMEOUT,
            index_sink: None,
            indexed_fields: Vec::new(),
        }
    }
}

fn now_ns() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as i64).unwrap_or(0)
}

struct EngineInner {
    root: PathBuf,
    schema: Schema,
    write_buffer_size: usize,
    auto_flush_timeout: Duration,
    indexed_fields: Vec<String>,

    mem_table_manager: RwLock<Arc<MemTableManager>>,
    sst_manager: RwLock<Arc<SSTableManager>>,
    version_set: RwLock<Arc<VersionSet>>,
    compaction_manager: RwLock<Arc<CompactionManager>>,
    index_sink: Arc<dyn IndexSink>,

    seq_counter: AtomicI64,
    last_write_time: AtomicI64,
    flush_mu: Mutex<()>,
    closed: AtomicBool,

    auto_flush_stop: Mutex<Option<Sender<()>>>,
    auto_flush_handle: Mutex<Option<JoinHandle<()>>>,
    inflight_flushes: Mutex<Vec<JoinHandle<()>>>,
}

/// A single append-only time-series table.
///
/// Cheaply `Clone`able — every clone shares the same underlying state via
/// `Arc`, which is how background threads (auto-flush watchdog, spawned
/// flushes) address the engine that spawned them.
#[derive(Clone)]
pub struct Engine(Arc<EngineInner>);

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("root", &self.0.root).finish()
    }
}

impl Engine {
    /// Opens (or creates) a table rooted at `root`.
    ///
    /// If `root/schema.json` already exists it is loaded and `schema_fields`
    /// is ignored; otherwise `schema_fields` must be `Some` and is persisted
    /// as the new table's schema. Replays the MANIFEST and every `*.wal`
    /// file, re-validating every replayed row against the schema (fatal on
    /// mismatch), then starts the CompactionManager and the auto-flush
    /// watchdog.
    pub fn open(
        root: impl AsRef<Path>,
        schema_fields: Option<Vec<crate::schema::FieldDef>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let wal_dir = root.join(WAL_DIR);
        let sst_dir = root.join(SST_DIR);
        let idx_dir = root.join(IDX_DIR);
        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&sst_dir)?;
        fs::create_dir_all(&idx_dir)?;

        let schema = if root.join("schema.json").exists() {
            Schema::load(&root)?
        } else {
            let fields = schema_fields.ok_or(EngineError::NoSchema)?;
            let schema = Schema::new(fields);
            schema.persist(&root)?;
            schema
        };

        let sst_manager = Arc::new(SSTableManager::open(&sst_dir)?);
        let version_set = Arc::new(VersionSet::open(&root)?);
        let (mem_table_manager, wal_max_seq) = MemTableManager::open(&wal_dir, config.write_buffer_size)?;
        let mem_table_manager = Arc::new(mem_table_manager);

        // Re-validate every replayed WAL row against the schema; a mismatch
        // is fatal — this table cannot safely reopen with this schema.
        for (_, bytes) in mem_table_manager.active()?.iter()? {
            schema.decode_row(&bytes)?;
        }
        for imm in mem_table_manager.immutables()? {
            for (_, bytes) in imm.iter()? {
                schema.decode_row(&bytes)?;
            }
        }

        let resumed_seq = sst_manager.get_max_seq().max(wal_max_seq.unwrap_or(-1));

        let index_sink: Arc<dyn IndexSink> = config.index_sink.clone().unwrap_or_else(|| Arc::new(NullIndexSink));
        index_sink.recover()?;

        let compaction_manager = CompactionManager::new(Arc::clone(&sst_manager), Arc::clone(&version_set), sst_dir);
        compaction_manager.start();

        let inner = Arc::new(EngineInner {
            root,
            schema,
            write_buffer_size: config.write_buffer_size,
            auto_flush_timeout: config.auto_flush_timeout,
            indexed_fields: config.indexed_fields,
            mem_table_manager: RwLock::new(mem_table_manager),
            sst_manager: RwLock::new(sst_manager),
            version_set: RwLock::new(version_set),
            compaction_manager: RwLock::new(compaction_manager),
            index_sink,
            seq_counter: AtomicI64::new(resumed_seq + 1),
            last_write_time: AtomicI64::new(now_ns()),
            flush_mu: Mutex::new(()),
            closed: AtomicBool::new(false),
            auto_flush_stop: Mutex::new(None),
            auto_flush_handle: Mutex::new(None),
            inflight_flushes: Mutex::new(Vec::new()),
        });

        let engine = Self(inner);
        engine.start_auto_flush_watchdog();
        info!(resumed_seq = resumed_seq + 1, "table opened");
        Ok(engine)
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.0.closed.load(Ordering::SeqCst) {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    fn mem(&self) -> Arc<MemTableManager> {
        self.0.mem_table_manager.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn sst(&self) -> Arc<SSTableManager> {
        self.0.sst_manager.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn vset(&self) -> Arc<VersionSet> {
        self.0.version_set.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn cman(&self) -> Arc<CompactionManager> {
        self.0.compaction_manager.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Validates and coerces `fields` against the schema, assigns the next
    /// `seq` and the current `time`, writes through the WAL and MemTable,
    /// feeds indexed fields to the `IndexSink`, and opportunistically
    /// triggers an asynchronous switch once the Active table crosses its
    /// size threshold. Returns the assigned `seq`.
    pub fn insert(&self, fields: BTreeMap<String, FieldValue>) -> Result<i64, EngineError> {
        self.ensure_open()?;
        let inner = &self.0;

        let mut row = Row { seq: 0, time: 0, fields };
        inner.schema.validate(&mut row)?;

        let seq = inner.seq_counter.fetch_add(1, Ordering::SeqCst);
        let time = now_ns();
        row.seq = seq;
        row.time = time;
        let bytes = inner.schema.encode_row(&row)?;

        match self.mem().put(seq, bytes.clone()) {
            Ok(()) => {}
            Err(MemTableError::FlushRequired) => {
                self.switch_active()?;
                self.mem().put(seq, bytes)?;
            }
            Err(e) => return Err(e.into()),
        }

        for field_name in &inner.indexed_fields {
            if let Some(value) = row.fields.get(field_name) {
                inner.index_sink.add(value, seq)?;
            }
        }

        inner.last_write_time.store(time, Ordering::SeqCst);

        if self.mem().active()?.should_switch() {
            self.switch_active()?;
        }

        Ok(seq)
    }

    /// Full decode of the row at `seq`: Active, then Immutable (newest
    /// first), then the SST manager.
    pub fn get(&self, seq: i64) -> Result<Option<Row>, EngineError> {
        self.ensure_open()?;
        let inner = &self.0;
        if let Some(bytes) = self.mem().get(seq)? {
            return Ok(Some(inner.schema.decode_row(&bytes)?));
        }
        Ok(self.sst().get(&inner.schema, seq)?)
    }

    /// Same as [`Self::get`] but decodes only `fields`.
    pub fn get_partial(&self, seq: i64, fields: &[String]) -> Result<Option<Row>, EngineError> {
        self.ensure_open()?;
        let inner = &self.0;
        if let Some(bytes) = self.mem().get(seq)? {
            return Ok(Some(inner.schema.decode_partial(&bytes, fields)?));
        }
        Ok(self.sst().get_partial(&inner.schema, seq, fields)?)
    }

    /// Seq-ordered, deduplicated scan over `[start_seq, end_seq)`, merging
    /// the Active iterator, every Immutable iterator, and every SST reader
    /// sorted by min key.
    pub fn scan(&self, start_seq: i64, end_seq: i64) -> Result<impl Iterator<Item = Row>, EngineError> {
        self.ensure_open()?;
        let inner = &self.0;

        let mut sources: Vec<Vec<SeqRecord>> = Vec::new();

        let mem = self.mem();
        sources.push(decode_range(&inner.schema, mem.active()?.iter()?, start_seq, end_seq)?);
        for imm in mem.immutables()? {
            sources.push(decode_range(&inner.schema, imm.iter()?, start_seq, end_seq)?);
        }

        for reader in self.sst().get_readers() {
            if reader.max_key() < start_seq || reader.min_key() >= end_seq {
                continue;
            }
            let mut rows = Vec::new();
            for seq in reader.get_all_keys()? {
                if seq < start_seq || seq >= end_seq {
                    continue;
                }
                if let Some(row) = reader.get(&inner.schema, seq)? {
                    rows.push(SeqRecord { seq, row });
                }
            }
            sources.push(rows);
        }

        Ok(MergeIterator::new(sources))
    }

    /// If Active has data, switches it into a new Immutable and flushes it
    /// synchronously (blocks until the SST is durable and registered). A
    /// switch on an empty Active is a no-op.
    pub fn flush(&self) -> Result<(), EngineError> {
        self.ensure_open()?;
        let inner = &self.0;
        let _guard = inner.flush_mu.lock().map_err(poison)?;
        if self.mem().active()?.keys()?.is_empty() {
            return Ok(());
        }
        let (old_wal_number, handle) = self.mem().switch()?;
        drop(_guard);
        self.flush_immutable(handle, old_wal_number)
    }

    /// Switches the Active table out for a fresh one and spawns the flush
    /// of the retired Immutable in the background, returning as soon as
    /// the switch itself (not the flush) has completed.
    fn switch_active(&self) -> Result<(), EngineError> {
        let inner = &self.0;
        let _guard = inner.flush_mu.lock().map_err(poison)?;
        let (old_wal_number, handle) = self.mem().switch()?;
        drop(_guard);
        self.spawn_flush(handle, old_wal_number);
        Ok(())
    }

    fn spawn_flush(&self, handle: ImmutableHandle, old_wal_number: u64) {
        let engine = self.clone();
        let join = std::thread::spawn(move || {
            if let Err(e) = engine.flush_immutable(handle, old_wal_number) {
                error!(error = %e, wal = old_wal_number, "background flush failed");
            }
        });
        self.0.inflight_flushes.lock().unwrap_or_else(|p| p.into_inner()).push(join);
    }

    /// Drains `handle` into a new level-0 SST, publishes the MANIFEST edit,
    /// deletes the old WAL, removes the Immutable, and asks the index sink
    /// to persist. An empty Immutable just deletes its WAL without writing
    /// a file.
    fn flush_immutable(&self, handle: ImmutableHandle, old_wal_number: u64) -> Result<(), EngineError> {
        let inner = &self.0;
        let rows = handle.table.iter()?;
        if rows.is_empty() {
            self.mem().remove_immutable(&handle)?;
            debug!(wal = old_wal_number, "flush: immutable was empty, dropped");
            return Ok(());
        }

        let encoded: Vec<EncodedRow> = rows
            .into_iter()
            .map(|(seq, bytes)| {
                let time = if bytes.len() >= 20 { i64::from_le_bytes(bytes[12..20].try_into().unwrap()) } else { 0 };
                EncodedRow { seq, time, bytes }
            })
            .collect();

        let version_set = self.vset();
        let file_number = version_set.allocate_file_number();
        let (_reader, summary) = self.sst().create_sst(file_number, &encoded)?;
        let metadata = FileMetadata {
            file_number,
            level: 0,
            size: summary.file_size,
            min_key: summary.min_key,
            max_key: summary.max_key,
            row_count: summary.row_count,
        };
        let max_seq_in_batch = encoded.iter().map(|r| r.seq).max().unwrap_or(version_set.last_sequence());
        let edit = VersionEdit::new()
            .add_file(metadata)
            .with_next_file_number(file_number + 1)
            .with_last_sequence(max_seq_in_batch.max(version_set.last_sequence()));
        version_set.log_and_apply(edit)?;

        self.mem().remove_immutable(&handle)?;
        inner.index_sink.persist()?;
        debug!(file_number, rows = encoded.len(), "flush committed");
        Ok(())
    }

    fn start_auto_flush_watchdog(&self) {
        let interval = (self.0.auto_flush_timeout / 2).max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
        *self.0.auto_flush_stop.lock().unwrap_or_else(|p| p.into_inner()) = Some(stop_tx);

        let engine = self.clone();
        let handle = std::thread::spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        if let Err(e) = engine.maybe_auto_flush() {
                            warn!(error = %e, "auto-flush watchdog: flush failed");
                        }
                    }
                }
            }
        });
        *self.0.auto_flush_handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
    }

    fn maybe_auto_flush(&self) -> Result<(), EngineError> {
        let inner = &self.0;
        let active = self.mem().active()?;
        if active.keys()?.is_empty() {
            return Ok(());
        }
        let last_write = inner.last_write_time.load(Ordering::SeqCst);
        let elapsed_ns = now_ns().saturating_sub(last_write);
        if elapsed_ns >= inner.auto_flush_timeout.as_nanos() as i64 {
            self.flush()?;
        }
        Ok(())
    }

    fn stop_auto_flush(&self) {
        if let Some(tx) = self.0.auto_flush_stop.lock().unwrap_or_else(|p| p.into_inner()).take() {
            drop(tx);
        }
        if let Some(handle) = self.0.auto_flush_handle.lock().unwrap_or_else(|p| p.into_inner()).take() {
            let _ = handle.join();
        }
    }

    fn wait_for_immutables_to_drain(&self) {
        let deadline = Instant::now() + DRAIN_DEADLINE;
        while Instant::now() < deadline {
            match self.mem().immutables() {
                Ok(v) if v.is_empty() => break,
                Ok(_) => std::thread::sleep(DRAIN_POLL_INTERVAL),
                Err(_) => break,
            }
        }
        let handles: Vec<_> =
            std::mem::take(&mut *self.0.inflight_flushes.lock().unwrap_or_else(|p| p.into_inner()));
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Orderly shutdown: stops the auto-flush watchdog and the
    /// CompactionManager, flushes Active, waits for Immutables to drain,
    /// persists the index sink, and syncs the MANIFEST. Idempotent.
    pub fn close(&self) -> Result<(), EngineError> {
        if self.0.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_auto_flush();
        self.cman().stop();
        self.flush()?;
        self.wait_for_immutables_to_drain();
        self.0.index_sink.persist()?;
        self.vset().close()?;
        info!("table closed");
        Ok(())
    }

    /// Resets the table to empty while preserving its schema: stops
    /// compaction, drains Immutables, replaces the MemTableManager and
    /// SSTableManager, recreates the MANIFEST, and resets the sequence
    /// counter to zero before restarting compaction.
    pub fn clean(&self) -> Result<(), EngineError> {
        self.ensure_open()?;
        let inner = &self.0;
        let _guard = inner.flush_mu.lock().map_err(poison)?;

        self.cman().stop();
        self.wait_for_immutables_to_drain();

        let wal_dir = inner.root.join(WAL_DIR);
        let sst_dir = inner.root.join(SST_DIR);
        let idx_dir = inner.root.join(IDX_DIR);

        remove_dir_all_if_exists(&wal_dir)?;
        remove_dir_all_if_exists(&sst_dir)?;
        remove_dir_all_if_exists(&idx_dir)?;
        for entry in fs::read_dir(&inner.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == "CURRENT" || name.starts_with("MANIFEST-") {
                fs::remove_file(entry.path())?;
            }
        }

        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&sst_dir)?;
        fs::create_dir_all(&idx_dir)?;

        let (new_mem, _) = MemTableManager::open(&wal_dir, inner.write_buffer_size)?;
        *inner.mem_table_manager.write().map_err(poison)? = Arc::new(new_mem);

        let new_sst = Arc::new(SSTableManager::open(&sst_dir)?);
        *inner.sst_manager.write().map_err(poison)? = Arc::clone(&new_sst);

        let new_version_set = Arc::new(VersionSet::open(&inner.root)?);
        *inner.version_set.write().map_err(poison)? = Arc::clone(&new_version_set);

        inner.seq_counter.store(0, Ordering::SeqCst);

        let new_compaction_manager = CompactionManager::new(new_sst, new_version_set, sst_dir);
        new_compaction_manager.start();
        *inner.compaction_manager.write().map_err(poison)? = new_compaction_manager;

        info!("table cleaned");
        Ok(())
    }

    /// Closes the table and recursively removes its root directory. Any
    /// further operation on this (or a cloned) handle returns
    /// [`EngineError::Closed`].
    pub fn destroy(&self) -> Result<(), EngineError> {
        self.close()?;
        match fs::remove_dir_all(&self.0.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("table destroyed");
        Ok(())
    }
}

fn remove_dir_all_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn decode_range(
    schema: &Schema,
    rows: Vec<(i64, Vec<u8>)>,
    start: i64,
    end: i64,
) -> Result<Vec<SeqRecord>, EngineError> {
    rows.into_iter()
        .filter(|(seq, _)| *seq >= start && *seq < end)
        .map(|(seq, bytes)| Ok(SeqRecord { seq, row: schema.decode_row(&bytes)? }))
        .collect()
}
