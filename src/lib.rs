// Core library for sinkline record pipelines

pub mod config;
pub mod context;
pub mod error;
pub mod parallel;
pub mod pipeline;
pub mod sink;
pub mod stats;

pub use context::Context;
pub use error::SinkError;
pub use parallel::{run_inline, ParallelConfig, ParallelSink, Submitter, Task, WorkerPool};
pub use pipeline::{
    AggregatingSink, ConvertingSink, DecomposingSink, FilteringSink, ModifyingSink,
    MultiAggregatingSink, StopHandle, StoppableSink, ThreadsafeAggregatingSink,
};
pub use sink::{
    BoxSink, ChainedSink, CollectedResults, CollectingSink, ConcurrentSink, SharedSink, Sink,
};
pub use stats::{WorkCounterHandle, WorkCounters};
