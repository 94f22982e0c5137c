use anyhow::anyhow;
use std::thread;

use sinkline::{
    AggregatingSink, BoxSink, CollectingSink, Context, ConvertingSink, FilteringSink,
    ModifyingSink, SharedSink, Sink, SinkError, StoppableSink,
};

#[test]
fn test_converting_drops_on_none() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let mut sink = ConvertingSink::new(
        |n: &i64, _ctx: &Context| {
            Ok(if *n == -1 {
                None
            } else {
                Some(format!("test-{}", n))
            })
        },
        collector,
    );
    let ctx = Context::new();

    sink.accept(-1, &ctx).unwrap();
    assert!(results.is_empty(), "-1 must be dropped");

    sink.accept(7, &ctx).unwrap();
    sink.accept(-1, &ctx).unwrap();
    sink.commit(&ctx).unwrap();
    assert_eq!(results.snapshot(), vec!["test-7".to_string()]);
    assert_eq!(results.commits(), 1);
}

#[test]
fn test_converting_error_propagates_unchanged() {
    let mut sink = ConvertingSink::new(
        |_: &u8, _ctx: &Context| -> anyhow::Result<Option<u8>> { Err(anyhow!("cannot convert")) },
        CollectingSink::new(),
    );
    let err = sink.accept(1, &Context::empty()).unwrap_err();
    assert_eq!(err.to_string(), "cannot convert");
}

#[test]
fn test_modifying_forwards_same_value() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let mut sink = ModifyingSink::new(
        |counter: &mut Box<u64>, _ctx: &Context| {
            **counter *= 12;
            Ok(())
        },
        collector,
    );

    let counter = Box::new(3u64);
    let address = &*counter as *const u64;
    sink.accept(counter, &Context::new()).unwrap();

    let forwarded = results.drain();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(*forwarded[0], 36);
    assert_eq!(&*forwarded[0] as *const u64, address);
}

#[test]
fn test_filtering_drops_silently() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let mut sink = FilteringSink::new(|n: &u32| n % 3 == 0, collector);
    let ctx = Context::new();
    for n in 0..10 {
        sink.accept(n, &ctx).unwrap();
    }
    sink.commit(&ctx).unwrap();
    assert_eq!(results.snapshot(), vec![0, 3, 6, 9]);
}

#[test]
fn test_stop_rejects_accept_and_commit() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let mut sink = StoppableSink::new(collector);
    let ctx = Context::new();

    sink.accept(1u8, &ctx).unwrap();
    sink.stop();
    sink.stop();

    let err = sink.accept(2, &ctx).unwrap_err();
    assert_eq!(err.downcast_ref::<SinkError>(), Some(&SinkError::Stopped));
    let err = sink.commit(&ctx).unwrap_err();
    assert_eq!(err.downcast_ref::<SinkError>(), Some(&SinkError::Stopped));

    assert_eq!(results.snapshot(), vec![1]);
    assert_eq!(results.commits(), 0);
}

#[test]
fn test_stop_from_another_thread() {
    let mut sink = StoppableSink::new(CollectingSink::<u8>::new());
    let handle = sink.stop_handle();
    thread::spawn(move || handle.stop()).join().unwrap();

    assert!(sink.is_stopped());
    assert!(sink.accept(0, &Context::empty()).is_err());
}

#[test]
fn test_clone_gets_fresh_buffer_and_shared_tail() {
    let collector = CollectingSink::new();
    let results = collector.results();
    let tail = SharedSink::from_sink(collector);
    let mut original: BoxSink<u32> = Box::new(FilteringSink::new(
        |n: &u32| n % 2 == 1,
        AggregatingSink::new(2, tail.clone()).unwrap(),
    ));
    let ctx = Context::new();

    original.accept(1, &ctx).unwrap();
    let mut clone = original.create_clone().unwrap();
    clone.accept(3, &ctx).unwrap();
    clone.accept(5, &ctx).unwrap();
    assert_eq!(results.snapshot(), vec![vec![3, 5]]);

    // The original's buffered record never leaked into the clone.
    original.partial_commit(&ctx).unwrap();
    assert_eq!(results.snapshot(), vec![vec![3, 5], vec![1]]);
    assert_eq!(results.partial_commits(), 1);
    assert_eq!(tail.handle_count(), 3);
}

#[test]
fn test_clone_fails_on_unshared_leaf() {
    let sink = FilteringSink::new(|_: &u8| true, CollectingSink::new());
    let err = sink.create_clone().err().unwrap();
    assert_eq!(err.downcast_ref::<SinkError>(), Some(&SinkError::NotCloneable));
}
