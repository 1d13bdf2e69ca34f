//! Micro-benchmarks for chronodb's core `Engine` operations.
//!
//! Uses Criterion for statistically rigorous measurement with regression
//! detection and HTML reports.
//!
//! # Running
//!
//! ```bash
//! cargo bench --bench micro              # run all micro-benchmarks
//! cargo bench --bench micro -- insert    # filter by name
//! ```
//!
//! Reports are generated in `target/criterion/report/index.html`.

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chronodb::engine::{Engine, EngineConfig};
use chronodb::schema::{FieldDef, FieldType, FieldValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn schema_fields() -> Vec<FieldDef> {
    vec![
        FieldDef { name: "tag".into(), field_type: FieldType::String, nullable: false },
        FieldDef { name: "value".into(), field_type: FieldType::F64, nullable: false },
    ]
}

fn row(i: u64) -> BTreeMap<String, FieldValue> {
    let mut m = BTreeMap::new();
    m.insert("tag".to_string(), FieldValue::String(format!("tag-{i:012}")));
    m.insert("value".to_string(), FieldValue::F64(i as f64));
    m
}

/// Small write buffer so flushes happen quickly during sustained-insert
/// benchmarks.
fn open_small_buffer(dir: &std::path::Path) -> Engine {
    let config = EngineConfig { write_buffer_size: 4 * 1024, ..EngineConfig::default() };
    Engine::open(dir, Some(schema_fields()), config).expect("open")
}

/// Large write buffer so everything stays resident in the Active MemTable.
fn open_memtable_only(dir: &std::path::Path) -> Engine {
    let config = EngineConfig { write_buffer_size: 64 * 1024 * 1024, ..EngineConfig::default() };
    Engine::open(dir, Some(schema_fields()), config).expect("open")
}

/// Inserts `count` rows and closes, so SSTables exist on disk for read
/// benchmarks.
fn prepopulate(dir: &std::path::Path, count: u64) -> Vec<i64> {
    let engine = open_small_buffer(dir);
    let seqs = (0..count).map(|i| engine.insert(row(i)).unwrap()).collect();
    engine.close().unwrap();
    seqs
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));
    group.bench_function("memtable_only", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_memtable_only(dir.path());
        let mut i = 0u64;
        b.iter(|| {
            engine.insert(black_box(row(i))).unwrap();
            i += 1;
        });
        engine.close().unwrap();
    });
    group.bench_function("with_flushes", |b| {
        let dir = TempDir::new().unwrap();
        let engine = open_small_buffer(dir.path());
        let mut i = 0u64;
        b.iter(|| {
            engine.insert(black_box(row(i))).unwrap();
            i += 1;
        });
        engine.close().unwrap();
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for count in [1_000u64, 10_000] {
        let dir = TempDir::new().unwrap();
        let seqs = prepopulate(dir.path(), count);
        let engine = Engine::open(dir.path(), None, EngineConfig::default()).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("sstable", count), |b| {
            let mut i = 0usize;
            b.iter(|| {
                let seq = seqs[i % seqs.len()];
                black_box(engine.get(seq).unwrap());
                i += 1;
            });
        });
        engine.close().unwrap();
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    for range_size in [10u64, 100, 1_000] {
        let dir = TempDir::new().unwrap();
        let seqs = prepopulate(dir.path(), 5_000);
        let engine = Engine::open(dir.path(), None, EngineConfig::default()).unwrap();

        group.throughput(Throughput::Elements(range_size));
        group.bench_function(BenchmarkId::new("sstable", range_size), |b| {
            b.iter(|| {
                let start = seqs[0];
                let end = seqs[(range_size as usize).min(seqs.len() - 1)];
                let rows: Vec<_> = engine.scan(start, end).unwrap().collect();
                black_box(rows);
            });
        });
        engine.close().unwrap();
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Recovery (open) latency
// ---------------------------------------------------------------------------

fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery");
    for count in [1_000u64, 10_000] {
        group.bench_function(BenchmarkId::new("open_existing", count), |b| {
            b.iter_batched(
                || {
                    let dir = TempDir::new().unwrap();
                    prepopulate(dir.path(), count);
                    dir
                },
                |dir| {
                    let engine = Engine::open(dir.path(), None, EngineConfig::default()).unwrap();
                    engine.close().unwrap();
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

fn bench_concurrent_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    for num_writers in [1u32, 2, 4] {
        group.bench_function(BenchmarkId::new("writers", num_writers), |b| {
            b.iter_batched(
                || TempDir::new().unwrap(),
                |dir| {
                    let engine = Arc::new(open_memtable_only(dir.path()));
                    let handles: Vec<_> = (0..num_writers)
                        .map(|t| {
                            let engine = Arc::clone(&engine);
                            thread::spawn(move || {
                                for i in 0..200u64 {
                                    engine.insert(row(t as u64 * 1_000_000 + i)).unwrap();
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                    engine.close().unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Close latency
// ---------------------------------------------------------------------------

fn bench_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("close");
    for count in [0u64, 1_000, 10_000] {
        group.bench_function(BenchmarkId::new("with_data", count), |b| {
            b.iter_batched(
                || {
                    let dir = TempDir::new().unwrap();
                    let engine = open_memtable_only(dir.path());
                    for i in 0..count {
                        engine.insert(row(i)).unwrap();
                    }
                    (dir, engine)
                },
                |(_dir, engine)| engine.close().unwrap(),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_scan, bench_recovery, bench_concurrent_inserts, bench_close);
criterion_main!(benches);
