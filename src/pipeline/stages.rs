//! Stateless per-record stages: converting, modifying and filtering.

use anyhow::Result;
use std::sync::Arc;

use crate::context::Context;
use crate::sink::{BoxSink, ChainedSink, Sink};

/// `convert(record, ctx)`: `None` drops the record.
pub type ConvertFn<S, T> = dyn Fn(&S, &Context) -> Result<Option<T>> + Send + Sync;
/// `touch(record, ctx)`: mutates the record in place.
pub type TouchFn<T> = dyn Fn(&mut T, &Context) -> Result<()> + Send + Sync;
pub type PredicateFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// Converts each record into zero or one records of another type.
pub struct ConvertingSink<S, T> {
    convert: Arc<ConvertFn<S, T>>,
    chain: ChainedSink<T>,
}

impl<S, T: Send + 'static> ConvertingSink<S, T> {
    pub fn new<F>(convert: F, target: impl Sink<T> + 'static) -> Self
    where
        F: Fn(&S, &Context) -> Result<Option<T>> + Send + Sync + 'static,
    {
        Self {
            convert: Arc::new(convert),
            chain: ChainedSink::new(target),
        }
    }
}

impl<S: Send + 'static, T: Send + 'static> Sink<S> for ConvertingSink<S, T> {
    fn accept(&mut self, record: S, ctx: &Context) -> Result<()> {
        match (self.convert)(&record, ctx)? {
            Some(converted) => self.chain.forward(converted, ctx),
            None => Ok(()),
        }
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<S>> {
        Ok(Box::new(Self {
            convert: Arc::clone(&self.convert),
            chain: self.chain.create_clone()?,
        }))
    }
}

/// Mutates each record in place and forwards the same value.
pub struct ModifyingSink<T> {
    touch: Arc<TouchFn<T>>,
    chain: ChainedSink<T>,
}

impl<T: Send + 'static> ModifyingSink<T> {
    pub fn new<F>(touch: F, target: impl Sink<T> + 'static) -> Self
    where
        F: Fn(&mut T, &Context) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            touch: Arc::new(touch),
            chain: ChainedSink::new(target),
        }
    }
}

impl<T: Send + 'static> Sink<T> for ModifyingSink<T> {
    fn accept(&mut self, mut record: T, ctx: &Context) -> Result<()> {
        (self.touch)(&mut record, ctx)?;
        self.chain.forward(record, ctx)
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        Ok(Box::new(Self {
            touch: Arc::clone(&self.touch),
            chain: self.chain.create_clone()?,
        }))
    }
}

/// Forwards a record only when the predicate holds.
pub struct FilteringSink<T> {
    predicate: Arc<PredicateFn<T>>,
    chain: ChainedSink<T>,
}

impl<T: Send + 'static> FilteringSink<T> {
    pub fn new<F>(predicate: F, target: impl Sink<T> + 'static) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            chain: ChainedSink::new(target),
        }
    }
}

impl<T: Send + 'static> Sink<T> for FilteringSink<T> {
    fn accept(&mut self, record: T, ctx: &Context) -> Result<()> {
        if (self.predicate)(&record) {
            self.chain.forward(record, ctx)
        } else {
            Ok(())
        }
    }

    fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.commit(ctx)
    }

    fn partial_commit(&mut self, ctx: &Context) -> Result<()> {
        self.chain.partial_commit(ctx)
    }

    fn create_clone(&self) -> Result<BoxSink<T>> {
        Ok(Box::new(Self {
            predicate: Arc::clone(&self.predicate),
            chain: self.chain.create_clone()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CollectingSink, SharedSink};
    use anyhow::anyhow;

    #[test]
    fn test_converting_drops_none() {
        let collector = CollectingSink::new();
        let results = collector.results();
        let mut sink = ConvertingSink::new(
            |n: &i64, _ctx: &Context| Ok((*n >= 0).then(|| format!("test-{}", n))),
            collector,
        );
        let ctx = Context::empty();

        sink.accept(-1, &ctx).unwrap();
        assert!(results.is_empty());

        sink.accept(7, &ctx).unwrap();
        assert_eq!(results.snapshot(), vec!["test-7".to_string()]);
    }

    #[test]
    fn test_converting_propagates_errors() {
        let mut sink = ConvertingSink::new(
            |_: &u8, _ctx: &Context| -> Result<Option<u8>> { Err(anyhow!("bad record")) },
            CollectingSink::new(),
        );
        let err = sink.accept(1, &Context::empty()).unwrap_err();
        assert_eq!(err.to_string(), "bad record");
    }

    #[test]
    fn test_modifying_touches_in_place() {
        let collector = CollectingSink::new();
        let results = collector.results();
        let mut sink = ModifyingSink::new(
            |n: &mut Vec<u32>, _ctx: &Context| {
                n.push(99);
                Ok(())
            },
            collector,
        );
        sink.accept(vec![1], &Context::empty()).unwrap();
        assert_eq!(results.snapshot(), vec![vec![1, 99]]);
    }

    #[test]
    fn test_filtering_forwards_only_matches() {
        let collector = CollectingSink::new();
        let results = collector.results();
        let mut sink = FilteringSink::new(|n: &u32| n % 2 == 0, collector);
        let ctx = Context::empty();
        for n in 0..10 {
            sink.accept(n, &ctx).unwrap();
        }
        sink.commit(&ctx).unwrap();
        assert_eq!(results.snapshot(), vec![0, 2, 4, 6, 8]);
        assert_eq!(results.commits(), 1);
    }

    #[test]
    fn test_clones_share_shared_tail() {
        let collector = CollectingSink::new();
        let results = collector.results();
        let sink = FilteringSink::new(|n: &u32| *n > 1, SharedSink::from_sink(collector));
        let mut a = sink.create_clone().unwrap();
        let mut b = sink.create_clone().unwrap();
        let ctx = Context::empty();
        a.accept(5, &ctx).unwrap();
        b.accept(1, &ctx).unwrap();
        b.accept(6, &ctx).unwrap();
        a.partial_commit(&ctx).unwrap();

        assert_eq!(results.snapshot(), vec![5, 6]);
        assert_eq!(results.partial_commits(), 1);
    }
}
