use anyhow::Result;

use super::{AggregatingSink, DecomposingSink, FilteringSink, ThreadsafeAggregatingSink};
use crate::context::Context;
use crate::parallel::{ParallelConfig, ParallelSink, Submitter};
use crate::sink::{BoxSink, CollectedResults, CollectingSink, SharedSink, Sink};
use crate::stats::{WorkCounterHandle, WorkCounters};

/// Trial-division primality test.
pub fn is_prime(n: &u64) -> bool {
    let n = *n;
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut divisor = 5u64;
    while divisor <= n / divisor {
        if n % divisor == 0 || n % (divisor + 2) == 0 {
            return false;
        }
        divisor += 6;
    }
    true
}

/// Builder for the reference prime pipeline:
///
/// filter(is_prime) → aggregate(chunk) → [parallel] → decompose →
/// threadsafe aggregate(tail chunk) → collector
#[derive(Debug, Clone)]
pub struct PrimePipelineBuilder {
    chunk_size: usize,
    tail_chunk_size: usize,
    parallel: Option<ParallelConfig>,
}

impl Default for PrimePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimePipelineBuilder {
    pub fn new() -> Self {
        Self {
            chunk_size: 64,
            tail_chunk_size: 256,
            parallel: None,
        }
    }

    /// Capacity of the aggregating stage feeding the fan-out.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Capacity of the shared aggregating tail.
    pub fn with_tail_chunk_size(mut self, tail_chunk_size: usize) -> Self {
        self.tail_chunk_size = tail_chunk_size;
        self
    }

    pub fn with_parallel(mut self, parallel: Option<ParallelConfig>) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build the chain. `submit` is only used when a parallel stage is configured.
    pub fn build(self, submit: Submitter) -> Result<PrimePipeline> {
        let collector = CollectingSink::new();
        let results = collector.results();
        let tail = SharedSink::new(ThreadsafeAggregatingSink::new(
            self.tail_chunk_size,
            collector,
        )?);
        let decompose = DecomposingSink::new(tail);

        let (fan_out, counters): (BoxSink<Vec<u64>>, Option<WorkCounterHandle>) =
            match self.parallel {
                Some(config) => {
                    let parallel = ParallelSink::with_submitter(Box::new(decompose), submit, config)?;
                    let counters = parallel.counter_handle();
                    (Box::new(parallel) as BoxSink<Vec<u64>>, Some(counters))
                }
                None => (Box::new(decompose) as BoxSink<Vec<u64>>, None),
            };

        let aggregate = AggregatingSink::new(self.chunk_size, fan_out)?;
        let head = FilteringSink::new(is_prime, aggregate);

        Ok(PrimePipeline {
            head: Box::new(head),
            results,
            counters,
        })
    }
}

/// A built prime pipeline plus handles onto its output and worker counters.
pub struct PrimePipeline {
    head: BoxSink<u64>,
    results: CollectedResults<Vec<u64>>,
    counters: Option<WorkCounterHandle>,
}

impl PrimePipeline {
    pub fn accept(&mut self, n: u64, ctx: &Context) -> Result<()> {
        self.head.accept(n, ctx)
    }

    pub fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.head.commit(ctx)
    }

    /// Feed `from..to`, then commit.
    pub fn run(&mut self, from: u64, to: u64, ctx: &Context) -> Result<()> {
        for n in from..to {
            self.accept(n, ctx)?;
        }
        self.commit(ctx)
    }

    /// Everything collected so far, sorted.
    pub fn primes(&self) -> Vec<u64> {
        let mut primes: Vec<u64> = self.results.snapshot().into_iter().flatten().collect();
        primes.sort_unstable();
        primes
    }

    pub fn commits(&self) -> usize {
        self.results.commits()
    }

    /// Worker counters, when the pipeline has a parallel stage.
    pub fn work_counters(&self) -> Option<WorkCounters> {
        self.counters.as_ref().map(WorkCounterHandle::snapshot)
    }
}
