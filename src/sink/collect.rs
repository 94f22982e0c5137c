use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::Sink;
use crate::context::Context;
use crate::error::lock_recover;

/// Leaf sink that keeps every record it receives.
///
/// The stored records live behind a [`CollectedResults`] handle, so they stay
/// readable after the sink itself has been moved into a chain. The sink is not
/// cloneable; wrap it in [`SharedSink`](super::SharedSink) to use it as the
/// tail of a parallel chain.
pub struct CollectingSink<T> {
    results: CollectedResults<T>,
}

impl<T> CollectingSink<T> {
    pub fn new() -> Self {
        Self {
            results: CollectedResults {
                records: Arc::new(Mutex::new(Vec::new())),
                commits: Arc::new(AtomicUsize::new(0)),
                partial_commits: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// Handle onto the collected records.
    pub fn results(&self) -> CollectedResults<T> {
        self.results.clone()
    }
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Sink<T> for CollectingSink<T> {
    fn accept(&mut self, record: T, _ctx: &Context) -> Result<()> {
        lock_recover(&self.results.records, "collected records").push(record);
        Ok(())
    }

    fn commit(&mut self, _ctx: &Context) -> Result<()> {
        self.results.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn partial_commit(&mut self, _ctx: &Context) -> Result<()> {
        self.results.partial_commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Read side of a [`CollectingSink`].
pub struct CollectedResults<T> {
    records: Arc<Mutex<Vec<T>>>,
    commits: Arc<AtomicUsize>,
    partial_commits: Arc<AtomicUsize>,
}

impl<T> Clone for CollectedResults<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            commits: Arc::clone(&self.commits),
            partial_commits: Arc::clone(&self.partial_commits),
        }
    }
}

impl<T> CollectedResults<T> {
    pub fn len(&self) -> usize {
        lock_recover(&self.records, "collected records").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn partial_commits(&self) -> usize {
        self.partial_commits.load(Ordering::SeqCst)
    }

    /// Take every record collected so far, leaving the store empty.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *lock_recover(&self.records, "collected records"))
    }
}

impl<T: Clone> CollectedResults<T> {
    pub fn snapshot(&self) -> Vec<T> {
        lock_recover(&self.records, "collected records").clone()
    }
}
