//! Parallel fan-out for sink chains
//!
//! The parallel sink batches records on the producer side and hands each batch
//! to a worker slot. Every worker lazily clones the downstream chain once and
//! replays its batches through that private clone; the clones meet again at
//! the first shared sink of the chain.
//!
//! # Module Structure
//!
//! - `types`: task and submission types, batches, outcomes and configuration
//! - `pool`: thread pool that backs the submission callback
//! - `tracker`: completion channel and commit barrier
//! - `worker`: worker slots and their drain tasks
//! - `processor`: main ParallelSink orchestration

mod pool;
mod processor;
mod tracker;
mod types;
mod worker;

// Re-export public types
pub use pool::{run_inline, WorkerPool, MAX_QUEUE_BOUND};
pub use processor::ParallelSink;
pub use types::{ParallelConfig, Submitter, Task, MAX_WORKERS};
