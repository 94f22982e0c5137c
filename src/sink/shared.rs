use anyhow::Result;
use std::sync::{Arc, Mutex};

use super::{BoxSink, Sink};
use crate::context::Context;
use crate::error::lock_recover;

/// Sink that is safe to call from several threads at once.
///
/// This is the shape of the shared tail of a parallel chain: every worker's
/// private clone ends up calling into the same `ConcurrentSink`, so it must do
/// its own mutual exclusion.
pub trait ConcurrentSink<T>: Send + Sync {
    fn accept(&self, record: T, ctx: &Context) -> Result<()>;

    fn commit(&self, ctx: &Context) -> Result<()>;

    fn partial_commit(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// Any ordinary sink becomes shareable by serializing it behind a mutex.
impl<T, S: Sink<T>> ConcurrentSink<T> for Mutex<S> {
    fn accept(&self, record: T, ctx: &Context) -> Result<()> {
        lock_recover(self, "shared sink").accept(record, ctx)
    }

    fn commit(&self, ctx: &Context) -> Result<()> {
        lock_recover(self, "shared sink").commit(ctx)
    }

    fn partial_commit(&self, ctx: &Context) -> Result<()> {
        lock_recover(self, "shared sink").partial_commit(ctx)
    }
}

/// Reference-counted handle onto one [`ConcurrentSink`] instance.
///
/// Cloning a chain stops here: `create_clone` hands out another handle to the
/// same instance instead of duplicating it.
pub struct SharedSink<T> {
    inner: Arc<dyn ConcurrentSink<T>>,
}

impl<T> Clone for SharedSink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> SharedSink<T> {
    pub fn new(sink: impl ConcurrentSink<T> + 'static) -> Self {
        Self {
            inner: Arc::new(sink),
        }
    }

    pub fn from_sink(sink: impl Sink<T> + 'static) -> Self {
        Self::new(Mutex::new(sink))
    }

    /// Whether both handles point at the same instance.
    pub fn same_instance(&self, other: &SharedSink<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles onto the instance.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: 'static> Sink<T> for SharedSink<T> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        self.inner.accept(record, ctx)
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.inner.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.inner.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        Ok(Box::new(self.clone()))
    }
}
