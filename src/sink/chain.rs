use anyhow::Result;

use super::{BoxSink, Sink};
use crate::context::Context;

/// Single-target forwarding base.
///
/// Stages embed a `ChainedSink` and override only what they need; commit and
/// partial commit forward to the target by default. Used on its own it is a
/// pass-through stage.
pub struct ChainedSink<T> {
    target: BoxSink<T>,
}

impl<T: Send + 'static> ChainedSink<T> {
    pub fn new(target: impl Sink<T> + 'static) -> Self {
        Self {
            target: Box::new(target),
        }
    }

    pub fn forward(&mut self, record: T, ctx: &Context) -> Result<()> {
        self.target.accept(record, ctx)
    }

    pub fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.target.commit(ctx)
    }

    pub fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.target.partial_commit(ctx)
    }

    /// Clone-or-share the target for a new copy of the owning stage.
    pub fn create_clone(&self) -> Result<Self> {
        Ok(Self {
            target: self.target.create_clone()?,
        })
    }
}

impl<T: Send + 'static> Sink<T> for ChainedSink<T> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        self.forward(record, ctx)
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        ChainedSink::commit(self, ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        ChainedSink::partial_commit(self, ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        Ok(Box::new(ChainedSink::create_clone(self)?))
    }
}
