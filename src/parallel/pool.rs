//! Thread pool backing the submission callback
//!
//! The parallel sink never spawns threads; it only hands tasks to a
//! [`Submitter`]. `WorkerPool` is the stock way to get one: a fixed set of
//! threads pulling tasks from a crossbeam channel.

use anyhow::{Context as _, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use super::types::{Submitter, Task, MAX_WORKERS};

/// Largest queue bound accepted; a bounded queue reserves its slots up front.
pub const MAX_QUEUE_BOUND: usize = 65_536;
use crate::error::{panic_message, SinkError};

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    // Shared with every submitter so that dropping the pool closes the queue
    // even while submitters are still alive.
    sender: Arc<RwLock<Option<Sender<Task>>>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Pool with an unbounded task queue.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_queue_bound(threads, None)
    }

    /// Pool whose queue holds at most `bound` waiting tasks; submitting to a
    /// full queue blocks the submitter.
    pub fn with_queue_bound(threads: usize, bound: Option<usize>) -> Result<Self> {
        if threads == 0 {
            return Err(SinkError::InvalidConfig("pool needs at least one thread".into()).into());
        }
        if threads > MAX_WORKERS {
            return Err(SinkError::InvalidConfig(format!(
                "{} pool threads exceeds the limit of {}",
                threads, MAX_WORKERS
            ))
            .into());
        }
        if let Some(size) = bound.filter(|&size| size > MAX_QUEUE_BOUND) {
            return Err(SinkError::InvalidConfig(format!(
                "queue bound {} exceeds the limit of {}",
                size, MAX_QUEUE_BOUND
            ))
            .into());
        }

        let (sender, receiver) = match bound {
            Some(size) => bounded(size),
            None => unbounded(),
        };

        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("sinkline-worker-{}", index))
                .spawn(move || pool_thread(index, receiver))
                .with_context(|| format!("failed to spawn pool thread {}", index))?;
            handles.push(handle);
        }
        tracing::debug!(threads, "worker pool started");

        Ok(Self {
            sender: Arc::new(RwLock::new(Some(sender))),
            handles,
        })
    }

    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Submission callback feeding this pool.
    ///
    /// Tasks submitted after the pool is dropped are discarded; the parallel
    /// sink notices and reports them as dropped.
    pub fn submitter(&self) -> Submitter {
        let sender = Arc::clone(&self.sender);
        Arc::new(move |task: Task| {
            let guard = sender.read().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                Some(sender) => {
                    if sender.send(task).is_err() {
                        tracing::warn!("worker pool is shut down, task discarded");
                    }
                }
                None => tracing::warn!("worker pool is shut down, task discarded"),
            }
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Threads exit once the queue is drained.
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn pool_thread(index: usize, receiver: Receiver<Task>) {
    while let Ok(task) = receiver.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            tracing::warn!(
                thread = index,
                "task panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Submission callback that runs every task immediately on the caller's thread.
pub fn run_inline() -> Submitter {
    Arc::new(|task: Task| task())
}
