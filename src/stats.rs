use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Records processed by each worker of a parallel sink, indexed by worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkCounters {
    per_worker: Vec<u64>,
}

impl WorkCounters {
    pub fn new(per_worker: Vec<u64>) -> Self {
        Self { per_worker }
    }

    pub fn total(&self) -> u64 {
        self.per_worker.iter().sum()
    }

    pub fn get(&self, worker: usize) -> Option<u64> {
        self.per_worker.get(worker).copied()
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.per_worker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_worker.is_empty()
    }

    /// Workers that processed at least one record.
    pub fn active_workers(&self) -> usize {
        self.per_worker.iter().filter(|&&n| n > 0).count()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.per_worker
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for WorkCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.per_worker.len().saturating_sub(1).to_string().len();
        for (worker, count) in self.per_worker.iter().enumerate() {
            writeln!(f, "worker {:>width$}: {}", worker, count, width = width)?;
        }
        write!(f, "total: {}", self.total())
    }
}

/// Live view onto the counters of a running parallel sink.
///
/// Stays valid after the sink has been moved into a chain.
#[derive(Debug, Clone)]
pub struct WorkCounterHandle {
    counters: Arc<[AtomicU64]>,
}

impl WorkCounterHandle {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            counters: (0..workers).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub(crate) fn add(&self, worker: usize, records: u64) {
        if let Some(counter) = self.counters.get(worker) {
            counter.fetch_add(records, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> WorkCounters {
        WorkCounters::new(
            self.counters
                .iter()
                .map(|c| c.load(Ordering::SeqCst))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let counters = WorkCounters::new(vec![3, 0, 7]);
        assert_eq!(counters.total(), 10);
        assert_eq!(counters.len(), 3);
        assert_eq!(counters.active_workers(), 2);
        assert_eq!(counters.get(2), Some(7));
        assert_eq!(counters.get(3), None);
    }

    #[test]
    fn test_display_table() {
        let counters = WorkCounters::new(vec![5, 12]);
        assert_eq!(counters.to_string(), "worker 0: 5\nworker 1: 12\ntotal: 17");
    }

    #[test]
    fn test_json() {
        let counters = WorkCounters::new(vec![1, 2]);
        assert_eq!(counters.to_json().unwrap(), r#"{"per_worker":[1,2]}"#);
    }

    #[test]
    fn test_handle_accumulates() {
        let handle = WorkCounterHandle::new(2);
        handle.add(0, 4);
        handle.add(1, 1);
        handle.add(0, 2);
        handle.add(9, 100);
        assert_eq!(handle.snapshot().as_slice(), &[6, 1]);
    }
}
