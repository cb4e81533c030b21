//! Performance benchmarks for the dispatch hot path.
//!
//! Tracks the per-job costs every shard pays before a callback goes out:
//! - Queue entry encode and decode
//! - FNV-1a partition and worker selection
//! - Token issue from a filled bucket
//! - Pool dispatch to workers with a no-op sender

use std::{
    hint::black_box,
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pacer_core::{codec, partition_for, select_worker};
use pacer_delivery::{TokenBucket, WorkerPool};
use pacer_testing::{JobBuilder, RecordingSender};
use tokio::runtime::Runtime;

/// Benchmarks queue entry encoding across payload sizes.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for payload_size in [64, 1024, 16 * 1024] {
        let job = JobBuilder::new()
            .primary_key("customer-1234")
            .payload(Bytes::from(vec![b'x'; payload_size]))
            .build();
        let entry = codec::encode(&job);

        group.throughput(Throughput::Bytes(payload_size as u64));

        group.bench_with_input(BenchmarkId::new("encode", payload_size), &job, |b, job| {
            b.iter(|| black_box(codec::encode(black_box(job))));
        });

        group.bench_with_input(BenchmarkId::new("decode", payload_size), &entry, |b, entry| {
            b.iter(|| black_box(codec::decode(black_box(entry))));
        });
    }

    group.finish();
}

/// Benchmarks key hashing for shard and worker selection.
fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");
    let keys: Vec<String> = (0..1000).map(|n| format!("account-{n}")).collect();

    group.throughput(Throughput::Elements(keys.len() as u64));

    group.bench_function("partition_for", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(partition_for(black_box(key), 16));
            }
        });
    });

    group.bench_function("select_worker", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(select_worker(black_box(key), 32));
            }
        });
    });

    group.finish();
}

/// Benchmarks token issue from a bucket refilled between batches.
fn bench_token_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_bucket");
    const BATCH: usize = 1000;

    group.throughput(Throughput::Elements(BATCH as u64));

    group.bench_function("try_take_batch", |b| {
        let bucket = TokenBucket::filled(BATCH);
        b.iter(|| {
            bucket.refresh();
            for _ in 0..BATCH {
                black_box(bucket.try_take());
            }
        });
    });

    group.finish();
}

/// Benchmarks end-to-end pool dispatch with an unlimited budget.
fn bench_pool_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("pool_dispatch");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    for worker_count in [1, 4, 16] {
        const JOBS: usize = 500;
        group.throughput(Throughput::Elements(JOBS as u64));

        group.bench_with_input(
            BenchmarkId::new("workers", worker_count),
            &worker_count,
            |b, &workers| {
                b.iter_custom(|iters| {
                    rt.block_on(async {
                        let mut total = Duration::ZERO;

                        for _ in 0..iters {
                            let sender = Arc::new(RecordingSender::new());
                            let bucket = Arc::new(TokenBucket::filled(JOBS));
                            let mut pool =
                                WorkerPool::new(0, workers, bucket, sender.clone()).unwrap();
                            pool.spawn_workers().unwrap();

                            let jobs: Vec<_> = (0..JOBS)
                                .map(|n| JobBuilder::new().primary_key(format!("key-{n}")).build())
                                .collect();

                            let start = Instant::now();
                            for job in jobs {
                                pool.dispatch(job).await.unwrap();
                            }
                            pool.shutdown().await.unwrap();
                            total += start.elapsed();

                            assert_eq!(sender.delivery_count(), JOBS);
                        }

                        total
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_routing, bench_token_bucket, bench_pool_dispatch);

criterion_main!(benches);
