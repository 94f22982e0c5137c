//! Core sink capability
//!
//! A sink is one stage of a processing chain. Records enter through `accept`,
//! `commit` closes the stream and `partial_commit` marks a checkpoint that does
//! not close it. Non-leaf sinks own exactly one downstream target.
//!
//! # Module Structure
//!
//! - `chain`: single-target forwarding base embedded by every non-leaf stage
//! - `shared`: `ConcurrentSink` and the `SharedSink` handle for thread-safe tails
//! - `collect`: leaf sink materializing everything it receives

mod chain;
mod collect;
mod shared;

use anyhow::Result;

use crate::context::Context;
use crate::error::SinkError;

pub use chain::ChainedSink;
pub use collect::{CollectedResults, CollectingSink};
pub use shared::{ConcurrentSink, SharedSink};

/// Owned, type-erased sink.
pub type BoxSink<T> = Box<dyn Sink<T>>;

/// The contract every stage implements.
///
/// Errors raised while processing propagate unchanged to the caller. Calling
/// `commit` twice flushes and forwards twice; idempotence is up to the target.
pub trait Sink<T>: Send {
    /// Process one record.
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()>;

    /// End of stream: flush buffered state in order, then commit the target.
    fn commit(&mut self, ctx: &Context) -> Result<()>;

    /// Checkpoint without closing the stream.
    ///
    /// The default ignores the signal, which is how a sink says it does not
    /// support checkpointing.
    fn partial_commit(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    /// Duplicate this sink for use by another worker.
    ///
    /// The copy gets its own mutable state; its target is cloned recursively
    /// until the first shared sink, which is attached by reference instead.
    fn create_clone(&self) -> Result<BoxSink<T>> {
        Err(SinkError::NotCloneable.into())
    }
}

impl<T, S: Sink<T> + ?Sized> Sink<T> for Box<S> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        (**self).accept(record, ctx)
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        (**self).commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        (**self).partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        (**self).create_clone()
    }
}
