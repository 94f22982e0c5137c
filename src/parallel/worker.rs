//! Worker slots for parallel processing
//!
//! A slot owns one worker's private clone of the downstream chain and a FIFO
//! queue of batches assigned to it. At most one drain task per slot is in the
//! pool at any time, which keeps a worker's batches in submission order and
//! gives the private clone a single user.

use anyhow::Result;
use crossbeam_channel::Sender;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::types::{BatchOutcome, Submitter, WorkBatch};
use crate::error::{lock_recover, panic_message, SinkError};
use crate::sink::BoxSink;
use crate::stats::WorkCounterHandle;

/// State every slot of one parallel sink shares.
pub(crate) struct EngineShared<T> {
    /// The downstream sink; cloned once per worker, committed by the engine.
    pub target: Mutex<BoxSink<T>>,
    pub outcomes: Sender<BatchOutcome>,
    pub counters: WorkCounterHandle,
}

impl<T> EngineShared<T> {
    fn create_worker_chain(&self, worker: usize) -> Result<BoxSink<T>> {
        let chain = lock_recover(&self.target, "parallel target").create_clone()?;
        tracing::debug!(worker, "created worker chain");
        Ok(chain)
    }
}

struct SlotQueue<T> {
    batches: VecDeque<WorkBatch<T>>,
    draining: bool,
}

pub(crate) struct WorkerSlot<T> {
    index: usize,
    chain: Mutex<Option<BoxSink<T>>>,
    queue: Mutex<SlotQueue<T>>,
    in_flight: AtomicUsize,
}

impl<T: Send + 'static> WorkerSlot<T> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            chain: Mutex::new(None),
            queue: Mutex::new(SlotQueue {
                batches: VecDeque::new(),
                draining: false,
            }),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Batches queued or running on this worker.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Queue a batch, submitting a drain task if none is active.
    pub fn enqueue(
        self: &Arc<Self>,
        batch: WorkBatch<T>,
        shared: &Arc<EngineShared<T>>,
        submit: &Submitter,
    ) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let schedule = {
            let mut queue = lock_recover(&self.queue, "worker queue");
            queue.batches.push_back(batch);
            !std::mem::replace(&mut queue.draining, true)
        };

        if schedule {
            let task = DrainTask {
                slot: Arc::clone(self),
                shared: Arc::clone(shared),
                started: false,
            };
            submit(Box::new(move || task.run()));
        }
    }

    fn next_batch(&self) -> Option<WorkBatch<T>> {
        let mut queue = lock_recover(&self.queue, "worker queue");
        let batch = queue.batches.pop_front();
        if batch.is_none() {
            queue.draining = false;
        }
        batch
    }

    fn process(&self, batch: WorkBatch<T>, shared: &EngineShared<T>) -> BatchOutcome {
        let WorkBatch { id, records, ctx } = batch;
        let count = records.len() as u64;

        let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
            let mut chain = lock_recover(&self.chain, "worker chain");
            if chain.is_none() {
                *chain = Some(shared.create_worker_chain(self.index)?);
            }
            if let Some(sink) = chain.as_mut() {
                for record in records {
                    sink.accept(record, &ctx)?;
                }
                sink.partial_commit(&ctx)?;
            }
            Ok(())
        }))
        .unwrap_or_else(|payload| {
            Err(SinkError::WorkerPanicked {
                worker: self.index,
                message: panic_message(payload.as_ref()),
            }
            .into())
        });

        if result.is_ok() {
            shared.counters.add(self.index, count);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        BatchOutcome {
            batch_id: id,
            worker: self.index,
            result,
        }
    }

    /// Report every queued batch as dropped. Used when a drain task is
    /// discarded by the pool without running.
    fn abandon(&self, shared: &EngineShared<T>) {
        let abandoned: Vec<_> = {
            let mut queue = lock_recover(&self.queue, "worker queue");
            queue.draining = false;
            queue.batches.drain(..).collect()
        };
        for batch in abandoned {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let _ = shared.outcomes.send(BatchOutcome {
                batch_id: batch.id,
                worker: self.index,
                result: Err(SinkError::TaskDropped { worker: self.index }.into()),
            });
        }
    }
}

/// Runs a slot's queue until it is empty.
struct DrainTask<T: Send + 'static> {
    slot: Arc<WorkerSlot<T>>,
    shared: Arc<EngineShared<T>>,
    started: bool,
}

impl<T: Send + 'static> DrainTask<T> {
    fn run(mut self) {
        self.started = true;
        while let Some(batch) = self.slot.next_batch() {
            let batch_id = batch.id;
            let outcome = self.slot.process(batch, &self.shared);
            tracing::trace!(
                worker = self.slot.index,
                batch = batch_id,
                ok = outcome.result.is_ok(),
                "batch done"
            );
            // The receiver is gone only if the parallel sink was dropped.
            let _ = self.shared.outcomes.send(outcome);
        }
    }
}

impl<T: Send + 'static> Drop for DrainTask<T> {
    fn drop(&mut self) {
        if !self.started {
            tracing::warn!(worker = self.slot.index, "drain task dropped before running");
            self.slot.abandon(&self.shared);
        }
    }
}
