use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use sinkline::pipeline::PrimePipelineBuilder;
use sinkline::{
    AggregatingSink, CollectingSink, Context, ParallelConfig, ParallelSink, SharedSink, Sink,
    WorkerPool,
};

const LIMIT: u64 = 100_000;

// =============================================================================
// Per-record dispatch cost
// =============================================================================

fn bench_aggregating_sink(c: &mut Criterion) {
    c.bench_function("aggregating_sink_10k", |b| {
        b.iter(|| {
            let mut sink = AggregatingSink::new(64, CollectingSink::new()).unwrap();
            let ctx = Context::new();
            for n in 0..10_000u64 {
                sink.accept(black_box(n), &ctx).unwrap();
            }
            sink.commit(&ctx).unwrap();
        });
    });
}

fn bench_parallel_dispatch(c: &mut Criterion) {
    let pool = WorkerPool::new(4).unwrap();
    let mut group = c.benchmark_group("parallel_dispatch_10k");
    for batch_size in [1usize, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let target = SharedSink::from_sink(CollectingSink::<u64>::new());
                    let mut sink = ParallelSink::with_submitter(
                        Box::new(target),
                        pool.submitter(),
                        ParallelConfig::new(4, batch_size),
                    )
                    .unwrap();
                    let ctx = Context::new();
                    for n in 0..10_000u64 {
                        sink.accept(black_box(n), &ctx).unwrap();
                    }
                    sink.commit(&ctx).unwrap();
                });
            },
        );
    }
    group.finish();
}

// =============================================================================
// Whole prime pipeline
// =============================================================================

fn bench_prime_pipeline(c: &mut Criterion) {
    let pool = WorkerPool::new(num_cpus::get()).unwrap();
    let mut group = c.benchmark_group("prime_pipeline_100k");
    group.sample_size(20);

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let mut pipeline = PrimePipelineBuilder::new().build(pool.submitter()).unwrap();
            pipeline.run(2, LIMIT, &Context::new()).unwrap();
            black_box(pipeline.primes().len());
        });
    });

    for workers in [1usize, 4, 15] {
        group.bench_with_input(
            BenchmarkId::new("parallel", workers),
            &workers,
            |b, &workers| {
                b.iter(|| {
                    let mut pipeline = PrimePipelineBuilder::new()
                        .with_chunk_size(16)
                        .with_parallel(Some(ParallelConfig::new(workers, 4)))
                        .build(pool.submitter())
                        .unwrap();
                    pipeline.run(2, LIMIT, &Context::new()).unwrap();
                    black_box(pipeline.primes().len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    parallel_sink_benches,
    bench_aggregating_sink,
    bench_parallel_dispatch,
    bench_prime_pipeline,
);
criterion_main!(parallel_sink_benches);
