//! Errors raised by the pipeline itself.
//!
//! Failures coming out of user callables are plain `anyhow::Error` values and
//! pass through the chain untouched; only conditions the pipeline detects on
//! its own are described here.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink was stopped and no longer accepts calls.
    #[error("sink has been stopped")]
    Stopped,

    /// A chain was cloned but one of its stages can neither be cloned nor shared.
    #[error("sink cannot be cloned; wrap shared stages in SharedSink")]
    NotCloneable,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch panicked inside a worker.
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// The submission callback discarded a task without running it.
    #[error("task for worker {worker} was dropped before it ran")]
    TaskDropped { worker: usize },
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_recover<'a, T: ?Sized>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        tracing::warn!(what, "lock poisoned by a panicking thread, recovering");
        poisoned.into_inner()
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
