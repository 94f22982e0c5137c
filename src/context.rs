//! Call-scoped side channel passed alongside every record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Metadata for one top-level operation.
///
/// A context is created once per operation and handed, unchanged, to every
/// `accept`/`commit`/`partial_commit` call made for it. It is `Copy`, so worker
/// threads each carry their own copy of the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context {
    operation_id: u64,
    started_at: Instant,
}

impl Context {
    /// A context with a fresh operation id.
    pub fn new() -> Self {
        Self {
            operation_id: NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed),
            started_at: Instant::now(),
        }
    }

    /// The anonymous context (operation id 0).
    pub fn empty() -> Self {
        Self {
            operation_id: 0,
            started_at: Instant::now(),
        }
    }

    pub fn operation_id(&self) -> u64 {
        self.operation_id
    }

    pub fn is_empty(&self) -> bool {
        self.operation_id == 0
    }

    /// Time since the operation started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::empty()
    }
}
