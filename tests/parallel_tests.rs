mod common;
use common::*;

use std::fmt;

use sinkline::pipeline::PrimePipelineBuilder;
use sinkline::{
    run_inline, CollectingSink, Context, ModifyingSink, ParallelConfig, ParallelSink, SharedSink,
    Sink, SinkError, Task, WorkerPool,
};

#[derive(Debug, PartialEq, Eq)]
struct Rejected(u64);

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} rejected", self.0)
    }
}

impl std::error::Error for Rejected {}

fn run_primes(
    limit: u64,
    parallel: Option<ParallelConfig>,
    chunk: usize,
    pool: &WorkerPool,
) -> Vec<u64> {
    let mut pipeline = PrimePipelineBuilder::new()
        .with_chunk_size(chunk)
        .with_tail_chunk_size(17)
        .with_parallel(parallel)
        .build(pool.submitter())
        .unwrap();
    pipeline.run(2, limit, &Context::new()).unwrap();
    pipeline.primes()
}

#[test]
fn test_primes_for_every_parallelism_and_batch_size() {
    let limit = 2_000;
    let expected = primes_below(limit);
    let pool = WorkerPool::new(4).unwrap();

    // Chunks of 8 primes give 38 chunks in total; 38 is the whole input.
    for workers in 1..=15 {
        for batch_size in [1, 2, 3, 7, 16, 38, 1_000] {
            let primes = run_primes(
                limit,
                Some(ParallelConfig::new(workers, batch_size)),
                8,
                &pool,
            );
            assert_eq!(
                primes, expected,
                "workers={} batch_size={}",
                workers, batch_size
            );
        }
    }
}

#[test]
fn test_primes_below_one_million() {
    let limit = 999_999;
    let expected = primes_below(limit);
    assert_eq!(expected.len(), 78_498);
    let pool = WorkerPool::new(8).unwrap();

    assert_eq!(run_primes(limit, None, 64, &pool), expected);
    for (workers, batch_size, chunk) in [
        (1, 1, 1_000),
        (4, 16, 64),
        (15, 3, 7),
        (15, 999_999, 64),
    ] {
        let primes = run_primes(
            limit,
            Some(ParallelConfig::new(workers, batch_size)),
            chunk,
            &pool,
        );
        assert_eq!(primes.len(), expected.len(), "workers={}", workers);
        assert_eq!(primes, expected);
    }
}

#[test]
fn test_growing_feed_is_consistent_after_every_commit() {
    let pool = WorkerPool::new(4).unwrap();
    for parallel in [None, Some(ParallelConfig::new(4, 1)), Some(ParallelConfig::new(3, 5))] {
        let mut pipeline = PrimePipelineBuilder::new()
            .with_chunk_size(3)
            .with_tail_chunk_size(4)
            .with_parallel(parallel.clone())
            .build(pool.submitter())
            .unwrap();
        let ctx = Context::new();

        for n in 2..400u64 {
            pipeline.accept(n, &ctx).unwrap();
            pipeline.commit(&ctx).unwrap();
            assert_eq!(
                pipeline.primes(),
                primes_below(n + 1),
                "after feeding {} with {:?}",
                n,
                parallel
            );
        }
        assert_eq!(pipeline.commits(), 398);
    }
}

#[test]
fn test_single_bad_record_fails_commit() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let reject = ModifyingSink::new(
        |n: &mut u64, _ctx: &Context| {
            if *n == 57 {
                return Err(Rejected(*n).into());
            }
            Ok(())
        },
        SharedSink::from_sink(collector),
    );
    let pool = WorkerPool::new(3).unwrap();
    let mut sink = ParallelSink::with_submitter(
        Box::new(reject),
        pool.submitter(),
        ParallelConfig::new(3, 10),
    )
    .unwrap();
    let ctx = Context::new();

    for n in 0..100u64 {
        sink.accept(n, &ctx).unwrap();
    }
    let err = sink.commit(&ctx).unwrap_err();

    assert_eq!(err.downcast_ref::<Rejected>(), Some(&Rejected(57)));
    let counters = sink.work_counters();
    assert!(counters.total() < 100);
    assert_eq!(counters.total(), 90);
    assert_eq!(results.commits(), 0);
    // Records of the failing batch before the bad one still reached the tail.
    assert_eq!(results.len(), 97);
}

#[test]
fn test_panicking_stage_is_reported() {
    let boom = ModifyingSink::new(
        |n: &mut u32, _ctx: &Context| {
            if *n == 3 {
                panic!("boom at {}", n);
            }
            Ok(())
        },
        SharedSink::from_sink(CollectingSink::new()),
    );
    let pool = WorkerPool::new(2).unwrap();
    let mut sink =
        ParallelSink::with_submitter(Box::new(boom), pool.submitter(), ParallelConfig::new(2, 2))
            .unwrap();
    let ctx = Context::new();
    for n in 0..6u32 {
        sink.accept(n, &ctx).unwrap();
    }

    let err = sink.commit(&ctx).unwrap_err();
    match err.downcast_ref::<SinkError>() {
        Some(SinkError::WorkerPanicked { message, .. }) => assert_eq!(message, "boom at 3"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_dropped_tasks_fail_commit_instead_of_hanging() {
    let target = SharedSink::from_sink(CollectingSink::<u8>::new());
    let mut sink = ParallelSink::new(target, |task: Task| drop(task), ParallelConfig::new(2, 1))
        .unwrap();
    let ctx = Context::new();
    sink.accept(1, &ctx).unwrap();

    let err = sink.commit(&ctx).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SinkError>(),
        Some(SinkError::TaskDropped { .. })
    ));
}

#[test]
fn test_unshared_target_cannot_be_cloned_per_worker() {
    let mut sink = ParallelSink::new(
        CollectingSink::<u8>::new(),
        |task: Task| task(),
        ParallelConfig::new(1, 1),
    )
    .unwrap();
    let ctx = Context::new();
    sink.accept(1, &ctx).unwrap();

    let err = sink.commit(&ctx).unwrap_err();
    assert_eq!(err.downcast_ref::<SinkError>(), Some(&SinkError::NotCloneable));
}

#[test]
fn test_counters_are_shared_across_workers() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let mut sink = ParallelSink::with_submitter(
        Box::new(SharedSink::from_sink(collector)),
        run_inline(),
        ParallelConfig::new(4, 5),
    )
    .unwrap();
    let ctx = Context::new();
    for n in 0..100u32 {
        sink.accept(n, &ctx).unwrap();
    }
    sink.commit(&ctx).unwrap();

    let counters = sink.work_counters();
    assert_eq!(counters.total(), 100);
    assert_eq!(counters.len(), 4);
    assert!(counters.active_workers() >= 1);
    assert_eq!(results.len(), 100);
    assert_eq!(results.commits(), 1);
    // One partial commit per batch.
    assert_eq!(results.partial_commits(), 20);
}
