//! Progress reporting for pool runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;

/// Sink invoked once per completed unit of work.
///
/// Implementations must be cheap and non-blocking; they run on the worker
/// that just finished a unit and must not become a second point of
/// contention.
pub trait ProgressSink: Send + Sync {
    /// Called after a unit completes. `done` counts completed units,
    /// `total` is the number submitted so far.
    fn on_unit_done(&self, done: usize, total: usize);
}

/// Sink that ignores all progress.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_unit_done(&self, _done: usize, _total: usize) {}
}

/// Sink that keeps an atomic completion counter.
#[derive(Debug, Default)]
pub struct CountingProgress {
    done: AtomicUsize,
}

impl CountingProgress {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Units completed so far.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CountingProgress {
    fn on_unit_done(&self, _done: usize, _total: usize) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink that logs a progress line every `every` completed units and at
/// the end of the batch.
#[derive(Debug)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    /// Log every `every` units (clamped to at least 1).
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl ProgressSink for LogProgress {
    fn on_unit_done(&self, done: usize, total: usize) {
        if done % self.every == 0 || done == total {
            info!("Processed {}/{} devices", done, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_progress() {
        let progress = CountingProgress::new();
        progress.on_unit_done(1, 3);
        progress.on_unit_done(2, 3);
        assert_eq!(progress.done(), 2);
    }
}
