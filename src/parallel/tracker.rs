//! Batch completion tracking
//!
//! Every submitted batch reports exactly one [`BatchOutcome`] on a channel.
//! The commit barrier waits for as many outcomes as batches were submitted and
//! keeps the first failure it sees.

use anyhow::Error;
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::types::BatchOutcome;

pub(crate) struct CompletionTracker {
    sender: Sender<BatchOutcome>,
    receiver: Receiver<BatchOutcome>,
    outstanding: usize,
}

impl CompletionTracker {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            outstanding: 0,
        }
    }

    /// Sender handed to worker tasks.
    pub fn sender(&self) -> Sender<BatchOutcome> {
        self.sender.clone()
    }

    /// Register one more batch that will report back.
    pub fn expect_one(&mut self) {
        self.outstanding += 1;
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Block until every registered batch has reported.
    ///
    /// Returns the first failure received, if any.
    pub fn wait_all(&mut self) -> Option<Error> {
        let mut first_failure: Option<Error> = None;
        let mut failures = 0usize;

        while self.outstanding > 0 {
            // We hold a sender ourselves, so recv only ends with an outcome.
            let Ok(outcome) = self.receiver.recv() else {
                break;
            };
            self.outstanding -= 1;

            if let Err(err) = outcome.result {
                failures += 1;
                if first_failure.is_none() {
                    tracing::warn!(
                        batch = outcome.batch_id,
                        worker = outcome.worker,
                        "batch failed: {:#}",
                        err
                    );
                    first_failure = Some(err);
                } else {
                    tracing::debug!(
                        batch = outcome.batch_id,
                        worker = outcome.worker,
                        "further batch failure: {:#}",
                        err
                    );
                }
            }
        }

        if failures > 1 {
            tracing::warn!(failures, "multiple batches failed, reporting the first");
        }
        first_failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::thread;

    fn outcome(batch_id: u64, result: anyhow::Result<()>) -> BatchOutcome {
        BatchOutcome {
            batch_id,
            worker: 0,
            result,
        }
    }

    #[test]
    fn test_wait_with_nothing_outstanding() {
        let mut tracker = CompletionTracker::new();
        assert!(tracker.wait_all().is_none());
    }

    #[test]
    fn test_waits_for_every_outcome() {
        let mut tracker = CompletionTracker::new();
        for _ in 0..3 {
            tracker.expect_one();
        }
        let sender = tracker.sender();
        let handle = thread::spawn(move || {
            for id in 0..3 {
                sender.send(outcome(id, Ok(()))).unwrap();
            }
        });
        assert!(tracker.wait_all().is_none());
        assert_eq!(tracker.outstanding(), 0);
        handle.join().unwrap();
    }

    #[test]
    fn test_first_failure_wins() {
        let mut tracker = CompletionTracker::new();
        let sender = tracker.sender();
        for (id, result) in [
            (0, Ok(())),
            (1, Err(anyhow!("first"))),
            (2, Err(anyhow!("second"))),
        ] {
            tracker.expect_one();
            sender.send(outcome(id, result)).unwrap();
        }
        let err = tracker.wait_all().unwrap();
        assert_eq!(err.to_string(), "first");
        assert!(tracker.wait_all().is_none());
    }
}
