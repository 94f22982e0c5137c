//! Main parallel sink
//!
//! Contains the ParallelSink struct that batches records on the producer side
//! and fans the batches out to worker slots.

use anyhow::Result;
use std::sync::{Arc, Mutex};

use super::tracker::CompletionTracker;
use super::types::{ParallelConfig, Submitter, Task, WorkBatch};
use super::worker::{EngineShared, WorkerSlot};
use crate::context::Context;
use crate::error::lock_recover;
use crate::pipeline::batching::batch_buffer;
use crate::sink::{BoxSink, Sink};
use crate::stats::{WorkCounterHandle, WorkCounters};

/// Fans records out to a pool of workers, each with a private clone of the
/// downstream chain.
///
/// `accept` fills a pending batch and hands every full one to the least-loaded
/// worker; it never waits for workers. `commit` submits the remainder, waits
/// for every batch to finish, then commits the downstream target once, or
/// returns the first batch failure without committing.
pub struct ParallelSink<T: Send + 'static> {
    config: ParallelConfig,
    submit: Submitter,
    shared: Arc<EngineShared<T>>,
    workers: Vec<Arc<WorkerSlot<T>>>,
    pending: Vec<T>,
    tracker: CompletionTracker,
    next_batch_id: u64,
    next_worker: usize,
}

impl<T: Send + 'static> ParallelSink<T> {
    pub fn new<F>(target: impl Sink<T> + 'static, submit: F, config: ParallelConfig) -> Result<Self>
    where
        F: Fn(Task) + Send + Sync + 'static,
    {
        Self::with_submitter(Box::new(target), Arc::new(submit), config)
    }

    pub fn with_submitter(
        target: BoxSink<T>,
        submit: Submitter,
        config: ParallelConfig,
    ) -> Result<Self> {
        config.validate()?;

        let tracker = CompletionTracker::new();
        let shared = Arc::new(EngineShared {
            target: Mutex::new(target),
            outcomes: tracker.sender(),
            counters: WorkCounterHandle::new(config.num_workers),
        });
        let workers = (0..config.num_workers)
            .map(|index| Arc::new(WorkerSlot::new(index)))
            .collect();

        tracing::debug!(
            workers = config.num_workers,
            batch_size = config.batch_size,
            "parallel sink created"
        );

        Ok(Self {
            pending: batch_buffer(config.batch_size),
            config,
            submit,
            shared,
            workers,
            tracker,
            next_batch_id: 0,
            next_worker: 0,
        })
    }

    /// Records processed so far by each worker.
    pub fn work_counters(&self) -> WorkCounters {
        self.shared.counters.snapshot()
    }

    /// Handle that keeps reporting counters after the sink is moved into a chain.
    pub fn counter_handle(&self) -> WorkCounterHandle {
        self.shared.counters.clone()
    }

    /// Batches submitted and not yet collected by a `commit`.
    pub fn outstanding_batches(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Least-loaded worker, scanning from a rotating start so ties go round-robin.
    fn pick_worker(&mut self) -> usize {
        let count = self.workers.len();
        let start = self.next_worker;
        self.next_worker = (self.next_worker + 1) % count;

        let mut best = start;
        let mut best_load = usize::MAX;
        for offset in 0..count {
            let index = (start + offset) % count;
            let load = self.workers[index].in_flight();
            if load < best_load {
                best = index;
                best_load = load;
                if load == 0 {
                    break;
                }
            }
        }
        best
    }

    fn dispatch(&mut self, ctx: &Context) {
        if self.pending.is_empty() {
            return;
        }
        let records = std::mem::replace(&mut self.pending, batch_buffer(self.config.batch_size));
        let id = self.next_batch_id;
        self.next_batch_id += 1;
        let worker = self.pick_worker();

        tracing::trace!(batch = id, worker, size = records.len(), "dispatching batch");
        self.tracker.expect_one();
        let batch = WorkBatch {
            id,
            records,
            ctx: *ctx,
        };
        self.workers[worker].enqueue(batch, &self.shared, &self.submit);
    }
}

impl<T: Send + 'static> Sink<T> for ParallelSink<T> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        self.pending.push(record);
        if self.pending.len() >= self.config.batch_size {
            self.dispatch(ctx);
        }
        Ok(())
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.dispatch(ctx);

        tracing::debug!(
            outstanding = self.tracker.outstanding(),
            operation = ctx.operation_id(),
            "waiting for batches"
        );
        if let Some(err) = self.tracker.wait_all() {
            return Err(err);
        }

        lock_recover(&self.shared.target, "parallel target").commit(ctx)
    }

    /// Checkpoint marker only: does not dispatch the pending batch or wait.
    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        lock_recover(&self.shared.target, "parallel target").partial_commit(ctx)
    }
}
