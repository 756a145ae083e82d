//! Storage layer benchmarks.
//!
//! Measures conditional bulk writes against the in-memory store.
//!
//! Run with: cargo bench -p twinsearch-storage

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;
use twinsearch_storage::{BulkOperation, DocumentRevision, DocumentStore, MemoryDocumentStore};

fn bulk(batch: usize, revision: u64) -> Vec<BulkOperation> {
    (0..batch)
        .map(|i| {
            BulkOperation::upsert(
                format!("org.acme:thing-{i}"),
                DocumentRevision::new(revision, 0),
                json!({"_id": format!("org.acme:thing-{i}"), "s": [{"k": "/a", "v": i, "g": ["user:alice"]}]}),
            )
        })
        .collect()
}

/// Benchmark: bulk upserts that all pass their revision filter.
fn bench_bulk_applied(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("bulk_applied");

    for batch in [1usize, 100, 1_000] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let store = Arc::new(MemoryDocumentStore::new());
            let mut revision = 0;
            b.iter(|| {
                revision += 1;
                black_box(rt.block_on(store.bulk_execute(bulk(batch, revision))).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark: bulk upserts that are all rejected as stale.
fn bench_bulk_stale(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("bulk_stale");

    for batch in [100usize, 1_000] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let store = Arc::new(MemoryDocumentStore::new());
            rt.block_on(store.bulk_execute(bulk(batch, u64::MAX))).unwrap();
            b.iter(|| {
                black_box(rt.block_on(store.bulk_execute(bulk(batch, 1))).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bulk_applied, bench_bulk_stale);
criterion_main!(benches);
