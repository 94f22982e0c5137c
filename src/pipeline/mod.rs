//! Pipeline stages built on the sink capability.

pub mod batching;
pub mod builders;
pub mod stages;
pub mod stoppable;

// Re-export main types for convenience
pub use batching::{
    AggregatingSink, DecomposingSink, MultiAggregatingSink, ThreadsafeAggregatingSink,
};
pub use builders::{is_prime, PrimePipeline, PrimePipelineBuilder};
pub use stages::{ConvertingSink, FilteringSink, ModifyingSink};
pub use stoppable::{StopHandle, StoppableSink};
