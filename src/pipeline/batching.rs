//! Batch stages
//!
//! Aggregating stages buffer records into batches of a fixed capacity and hand
//! each full batch downstream as one `Vec`. The decomposing stage does the
//! reverse. Remainders are flushed on `commit` and on `partial_commit`, so a
//! checkpoint always leaves every accepted record downstream.

use anyhow::Result;
use std::sync::Mutex;

use crate::context::Context;
use crate::error::{lock_recover, SinkError};
use crate::sink::{BoxSink, ChainedSink, ConcurrentSink, Sink};

/// Upper bound on up-front buffer reservations; larger batches grow on demand.
const MAX_PREALLOC: usize = 4096;

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(SinkError::InvalidConfig("batch capacity must be at least 1".into()).into());
    }
    Ok(())
}

/// Empty buffer for a batch of up to `capacity` records.
pub(crate) fn batch_buffer<T>(capacity: usize) -> Vec<T> {
    Vec::with_capacity(capacity.min(MAX_PREALLOC))
}

/// Single-threaded aggregation. `&mut self` is the serialization.
pub struct AggregatingSink<T> {
    capacity: usize,
    buffer: Vec<T>,
    chain: ChainedSink<Vec<T>>,
}

impl<T: Send + 'static> AggregatingSink<T> {
    pub fn new(capacity: usize, target: impl Sink<Vec<T>> + 'static) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            capacity,
            buffer: batch_buffer(capacity),
            chain: ChainedSink::new(target),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn flush(&mut self, ctx: &Context) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.buffer, batch_buffer(self.capacity));
        self.chain.forward(batch, ctx)
    }
}

impl<T: Send + 'static> Sink<T> for AggregatingSink<T> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.capacity {
            self.flush(ctx)?;
        }
        Ok(())
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.flush(ctx)?;
        self.chain.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.flush(ctx)?;
        self.chain.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        Ok(Box::new(Self {
            capacity: self.capacity,
            buffer: batch_buffer(self.capacity),
            chain: self.chain.create_clone()?,
        }))
    }
}

/// Aggregation that may be fed from several threads at once.
///
/// Append, test-for-full and swap-out happen under one lock, so exactly one
/// flush happens per `capacity` records whichever threads contributed them.
/// The target lock is taken before the buffer lock is released, so batches
/// reach the target in the order they were cut.
pub struct ThreadsafeAggregatingSink<T> {
    capacity: usize,
    buffer: Mutex<Vec<T>>,
    target: Mutex<BoxSink<Vec<T>>>,
}

impl<T: Send + 'static> ThreadsafeAggregatingSink<T> {
    pub fn new(capacity: usize, target: impl Sink<Vec<T>> + 'static) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            capacity,
            buffer: Mutex::new(batch_buffer(capacity)),
            target: Mutex::new(Box::new(target)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffered(&self) -> usize {
        lock_recover(&self.buffer, "aggregation buffer").len()
    }

    /// Forward whatever is buffered, then hand the still-locked target to `then`.
    fn flush_then(
        &self,
        ctx: &Context,
        then: impl FnOnce(&mut BoxSink<Vec<T>>) -> Result<()>,
    ) -> Result<()> {
        let mut buffer = lock_recover(&self.buffer, "aggregation buffer");
        let batch = if buffer.is_empty() {
            None
        } else {
            Some(std::mem::replace(&mut *buffer, batch_buffer(self.capacity)))
        };
        let mut target = lock_recover(&self.target, "aggregation target");
        drop(buffer);

        if let Some(batch) = batch {
            target.accept(batch, ctx)?;
        }
        then(&mut *target)
    }
}

impl<T: Send + 'static> ConcurrentSink<T> for ThreadsafeAggregatingSink<T> {
    fn accept(&self, record: T, ctx: &Context) -> Result<()> {
        let mut buffer = lock_recover(&self.buffer, "aggregation buffer");
        buffer.push(record);
        if buffer.len() < self.capacity {
            return Ok(());
        }
        let batch = std::mem::replace(&mut *buffer, batch_buffer(self.capacity));
        let mut target = lock_recover(&self.target, "aggregation target");
        drop(buffer);
        target.accept(batch, ctx)
    }

    fn commit(&self, ctx: &Context) -> Result<()> {
        self.flush_then(ctx, |target| target.commit(ctx))
    }

    fn partial_commit(&self, ctx: &Context) -> Result<()> {
        self.flush_then(ctx, |target| target.partial_commit(ctx))
    }
}

/// Thread-safe aggregation fed with whole batches.
///
/// Incoming batches are concatenated and re-cut into batches of exactly
/// `capacity`, under the same lock discipline as
/// [`ThreadsafeAggregatingSink`].
pub struct MultiAggregatingSink<T> {
    capacity: usize,
    buffer: Mutex<Vec<T>>,
    target: Mutex<BoxSink<Vec<T>>>,
}

impl<T: Send + 'static> MultiAggregatingSink<T> {
    pub fn new(capacity: usize, target: impl Sink<Vec<T>> + 'static) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            capacity,
            buffer: Mutex::new(batch_buffer(capacity)),
            target: Mutex::new(Box::new(target)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffered(&self) -> usize {
        lock_recover(&self.buffer, "aggregation buffer").len()
    }

    fn flush_then(
        &self,
        ctx: &Context,
        then: impl FnOnce(&mut BoxSink<Vec<T>>) -> Result<()>,
    ) -> Result<()> {
        let mut buffer = lock_recover(&self.buffer, "aggregation buffer");
        let batch = if buffer.is_empty() {
            None
        } else {
            Some(std::mem::replace(&mut *buffer, batch_buffer(self.capacity)))
        };
        let mut target = lock_recover(&self.target, "aggregation target");
        drop(buffer);

        if let Some(batch) = batch {
            target.accept(batch, ctx)?;
        }
        then(&mut *target)
    }
}

impl<T: Send + 'static> ConcurrentSink<Vec<T>> for MultiAggregatingSink<T> {
    fn accept(&self, records: Vec<T>, ctx: &Context) -> Result<()> {
        let mut buffer = lock_recover(&self.buffer, "aggregation buffer");
        buffer.extend(records);
        if buffer.len() < self.capacity {
            return Ok(());
        }
        let mut full = Vec::new();
        while buffer.len() >= self.capacity {
            let rest = buffer.split_off(self.capacity);
            full.push(std::mem::replace(&mut *buffer, rest));
        }
        let mut target = lock_recover(&self.target, "aggregation target");
        drop(buffer);

        for batch in full {
            target.accept(batch, ctx)?;
        }
        Ok(())
    }

    fn commit(&self, ctx: &Context) -> Result<()> {
        self.flush_then(ctx, |target| target.commit(ctx))
    }

    fn partial_commit(&self, ctx: &Context) -> Result<()> {
        self.flush_then(ctx, |target| target.partial_commit(ctx))
    }
}

/// Replays each record of a batch, in order, as its own `accept`.
pub struct DecomposingSink<T> {
    chain: ChainedSink<T>,
}

impl<T: Send + 'static> DecomposingSink<T> {
    pub fn new(target: impl Sink<T> + 'static) -> Self {
        Self {
            chain: ChainedSink::new(target),
        }
    }
}

impl<T: Send + 'static> Sink<Vec<T>> for DecomposingSink<T> {
    fn accept(&mut self, batch: Vec<T>, ctx: &Context) -> Result<()> {
        for record in batch {
            self.chain.forward(record, ctx)?;
        }
        Ok(())
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<Vec<T>>> {
        Ok(Box::new(Self {
            chain: self.chain.create_clone()?,
        }))
    }
}
