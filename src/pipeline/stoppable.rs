use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::context::Context;
use crate::error::SinkError;
use crate::sink::{BoxSink, ChainedSink, Sink};

/// Lifecycle gate in front of a target.
///
/// Starts active. Once stopped, every call fails with [`SinkError::Stopped`]
/// without reaching the target, and there is no way back. Clones share the
/// stop state with the sink they were cloned from.
pub struct StoppableSink<T> {
    stopped: Arc<AtomicBool>,
    chain: ChainedSink<T>,
}

/// Stops a [`StoppableSink`] from another thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl<T: Send + 'static> StoppableSink<T> {
    pub fn new(target: impl Sink<T> + 'static) -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            chain: ChainedSink::new(target),
        }
    }

    /// Idempotent.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!("sink stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stopped: Arc::clone(&self.stopped),
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(SinkError::Stopped.into());
        }
        Ok(())
    }
}

impl<T: Send + 'static> Sink<T> for StoppableSink<T> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        self.ensure_active()?;
        self.chain.forward(record, ctx)
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.ensure_active()?;
        self.chain.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.ensure_active()?;
        self.chain.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        Ok(Box::new(Self {
            stopped: Arc::clone(&self.stopped),
            chain: self.chain.create_clone()?,
        }))
    }
}
