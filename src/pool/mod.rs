//! Bounded worker pool for fanning out per-device operations.
//!
//! The pool owns a fixed number of workers that drain one shared input
//! channel and publish one [`WorkResult`] per consumed unit on a result
//! channel. Termination is driven by closing the input channel after
//! submission: every worker exits once the channel is drained, and
//! [`WorkerPool::run_to_completion`] collects exactly one result per
//! submitted unit before joining the workers. There is no polled
//! empty-check or sleep loop anywhere in the protocol.
//!
//! The pool is generic over the unit of work, so reachability probing and
//! command execution share the same engine.

mod progress;

pub use progress::{CountingProgress, LogProgress, NoopProgress, ProgressSink};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use log::warn;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::device::DeviceId;
use crate::error::{PoolError, Result};

/// A unit of work the pool can execute.
///
/// The only thing the pool needs from a unit is the device it targets, so
/// a result can still be labelled when the unit's future panics.
pub trait WorkUnit: Send + 'static {
    /// Identity of the device this unit operates on.
    fn device(&self) -> DeviceId;
}

/// Outcome of one unit of work.
///
/// Each variant is aggregated and logged differently upstream; the
/// taxonomy is part of the crate's public contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation succeeded and produced a payload.
    Success(T),
    /// The device did not accept a TCP connection.
    Unreachable,
    /// The session was refused at authentication.
    AuthFailed,
    /// The operation exceeded its hard timeout.
    Timeout,
    /// Any transport or session negotiation failure.
    ProtocolError(String),
    /// The session succeeded but the command returned nothing usable.
    NoOutput,
}

impl<T> Outcome<T> {
    /// Short label for log lines and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Unreachable => "unreachable",
            Outcome::AuthFailed => "auth failed",
            Outcome::Timeout => "timeout",
            Outcome::ProtocolError(_) => "protocol error",
            Outcome::NoOutput => "no output",
        }
    }

    /// Whether this outcome carries a payload.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::ProtocolError(detail) => write!(f, "protocol error: {}", detail),
            other => f.write_str(other.label()),
        }
    }
}

/// Result of one unit of work, labelled with its device.
#[derive(Debug, Clone)]
pub struct WorkResult<T> {
    /// Device the unit targeted.
    pub device: DeviceId,

    /// What happened.
    pub outcome: Outcome<T>,
}

/// Fixed-concurrency execution engine mapping work units to results.
///
/// Lifecycle: [`new`](Self::new) spawns the workers idle,
/// [`submit_all`](Self::submit_all) enqueues units without blocking, and
/// [`run_to_completion`](Self::run_to_completion) closes the input,
/// drains exactly one result per submitted unit and joins the workers.
/// Results carry no ordering guarantee; match them by device identity.
pub struct WorkerPool<U, T>
where
    U: WorkUnit,
    T: Send + 'static,
{
    unit_tx: Option<mpsc::UnboundedSender<U>>,
    result_rx: mpsc::UnboundedReceiver<WorkResult<T>>,
    workers: Vec<JoinHandle<()>>,
    cancel_tx: watch::Sender<bool>,
    submitted: usize,
    total: Arc<AtomicUsize>,
}

impl<U, T> WorkerPool<U, T>
where
    U: WorkUnit,
    T: Send + 'static,
{
    /// Create a pool with `worker_count` workers and no progress
    /// reporting.
    pub fn new<F, Fut>(worker_count: usize, unit_fn: F) -> Self
    where
        F: Fn(U) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self::with_progress(worker_count, Arc::new(NoopProgress), unit_fn)
    }

    /// Create a pool that reports each completed unit to `progress`.
    ///
    /// `worker_count` is clamped to at least one. `unit_fn` runs every
    /// unit; a panic escaping it is caught at the worker boundary and
    /// converted to [`Outcome::ProtocolError`] — one device can never
    /// take down the pool or its siblings.
    pub fn with_progress<F, Fut>(
        worker_count: usize,
        progress: Arc<dyn ProgressSink>,
        unit_fn: F,
    ) -> Self
    where
        F: Fn(U) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        let (unit_tx, unit_rx) = mpsc::unbounded_channel::<U>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<WorkResult<T>>();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let input = Arc::new(Mutex::new(unit_rx));
        let unit_fn = Arc::new(unit_fn);
        let total = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let workers = (0..worker_count.max(1))
            .map(|_| {
                let input = input.clone();
                let result_tx = result_tx.clone();
                let cancel_rx = cancel_rx.clone();
                let unit_fn = unit_fn.clone();
                let progress = progress.clone();
                let total = total.clone();
                let done = done.clone();
                tokio::spawn(worker_loop(
                    input, result_tx, cancel_rx, unit_fn, progress, total, done,
                ))
            })
            .collect();

        Self {
            unit_tx: Some(unit_tx),
            result_rx,
            workers,
            cancel_tx,
            submitted: 0,
            total,
        }
    }

    /// Enqueue every unit without blocking. Returns how many were
    /// accepted; units submitted after [`shutdown`](Self::shutdown) are
    /// dropped with a warning.
    pub fn submit_all(&mut self, units: impl IntoIterator<Item = U>) -> usize {
        let Some(tx) = &self.unit_tx else {
            warn!("Units submitted after pool shutdown were dropped");
            return 0;
        };

        let mut accepted = 0;
        for unit in units {
            // Send only fails when every worker is gone, which means the
            // pool was cancelled; dropping the unit is correct then.
            if tx.send(unit).is_ok() {
                accepted += 1;
            }
        }
        self.submitted += accepted;
        self.total.store(self.submitted, Ordering::SeqCst);
        accepted
    }

    /// Close the input channel so workers exit once it is drained.
    /// Idempotent; calling it twice is a no-op.
    pub fn shutdown(&mut self) {
        self.unit_tx.take();
    }

    /// Best-effort cancellation: workers finish the unit in flight, then
    /// stop taking new ones. Results already produced are still returned
    /// by [`run_to_completion`](Self::run_to_completion); queued units
    /// are discarded.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Block until every submitted unit has produced a result and all
    /// workers have exited, then return the results.
    ///
    /// Exactly one result per submitted unit is returned unless the pool
    /// was cancelled, in which case only the results observed before
    /// cancellation come back. Order does not match submission order.
    pub async fn run_to_completion(mut self) -> Result<Vec<WorkResult<T>>> {
        self.shutdown();

        let mut results = Vec::with_capacity(self.submitted);
        while results.len() < self.submitted {
            match self.result_rx.recv().await {
                Some(result) => results.push(result),
                // All workers exited; only possible after cancel().
                None => break,
            }
        }

        for (index, handle) in self.workers.drain(..).enumerate() {
            handle.await.map_err(|e| PoolError::WorkerJoin {
                index,
                detail: e.to_string(),
            })?;
        }

        Ok(results)
    }
}

/// One worker: drain the shared input channel until it closes or the
/// pool is cancelled, publishing exactly one result per consumed unit.
async fn worker_loop<U, T, F, Fut>(
    input: Arc<Mutex<mpsc::UnboundedReceiver<U>>>,
    result_tx: mpsc::UnboundedSender<WorkResult<T>>,
    mut cancel_rx: watch::Receiver<bool>,
    unit_fn: Arc<F>,
    progress: Arc<dyn ProgressSink>,
    total: Arc<AtomicUsize>,
    done: Arc<AtomicUsize>,
) where
    U: WorkUnit,
    T: Send + 'static,
    F: Fn(U) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome<T>> + Send + 'static,
{
    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let unit = {
            let mut rx = input.lock().await;
            tokio::select! {
                unit = rx.recv() => unit,
                _ = cancel_rx.changed() => None,
            }
        };
        let Some(unit) = unit else { break };

        let device = unit.device();
        let outcome = match AssertUnwindSafe(unit_fn(unit)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                warn!("Worker unit for {} panicked", device);
                Outcome::ProtocolError(panic_detail(panic))
            }
        };

        let completed = done.fetch_add(1, Ordering::SeqCst) + 1;
        progress.on_unit_done(completed, total.load(Ordering::SeqCst));

        if result_tx.send(WorkResult { device, outcome }).is_err() {
            // Collector went away; nothing left to report to.
            break;
        }
    }
}

fn panic_detail(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    struct TestUnit {
        addr: IpAddr,
        panics: bool,
        delay: Duration,
    }

    impl TestUnit {
        fn plain(n: u8) -> Self {
            Self {
                addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, n)),
                panics: false,
                delay: Duration::ZERO,
            }
        }
    }

    impl WorkUnit for TestUnit {
        fn device(&self) -> DeviceId {
            DeviceId {
                hostname: None,
                addr: self.addr,
            }
        }
    }

    async fn run_unit(unit: TestUnit) -> Outcome<String> {
        if unit.panics {
            panic!("simulated socket failure");
        }
        if !unit.delay.is_zero() {
            tokio::time::sleep(unit.delay).await;
        }
        Outcome::Success(unit.addr.to_string())
    }

    #[tokio::test]
    async fn test_exactly_one_result_per_unit() {
        for worker_count in [1, 4, 32] {
            let mut pool = WorkerPool::new(worker_count, run_unit);
            pool.submit_all((1..=16).map(TestUnit::plain));
            let results = pool.run_to_completion().await.unwrap();
            assert_eq!(results.len(), 16, "worker_count={}", worker_count);
        }
    }

    #[tokio::test]
    async fn test_no_result_lost_or_duplicated() {
        let mut pool = WorkerPool::new(4, run_unit);
        pool.submit_all((1..=30).map(TestUnit::plain));
        let results = pool.run_to_completion().await.unwrap();

        let identities: BTreeSet<IpAddr> = results.iter().map(|r| r.device.addr).collect();
        assert_eq!(results.len(), 30);
        assert_eq!(identities.len(), 30);
    }

    #[tokio::test]
    async fn test_panic_becomes_protocol_error() {
        let mut pool = WorkerPool::new(2, run_unit);
        let mut units: Vec<TestUnit> = (1..=5).map(TestUnit::plain).collect();
        units[2].panics = true;
        let bad_addr = units[2].addr;
        pool.submit_all(units);

        let results = pool.run_to_completion().await.unwrap();
        assert_eq!(results.len(), 5);

        let bad = results.iter().find(|r| r.device.addr == bad_addr).unwrap();
        match &bad.outcome {
            Outcome::ProtocolError(detail) => assert!(detail.contains("simulated")),
            other => panic!("expected protocol error, got {:?}", other),
        }
        assert_eq!(results.iter().filter(|r| r.outcome.is_success()).count(), 4);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let mut pool = WorkerPool::new(2, run_unit);
        pool.submit_all((1..=4).map(TestUnit::plain));
        pool.shutdown();
        pool.shutdown();
        let results = pool.run_to_completion().await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_submission_terminates() {
        let mut pool = WorkerPool::new(3, run_unit);
        pool.submit_all(Vec::<TestUnit>::new());
        let results = pool.run_to_completion().await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_taking_units() {
        // Current-thread runtime: workers have not run yet when cancel()
        // is called, so no unit is ever taken.
        let mut pool = WorkerPool::new(1, run_unit);
        pool.submit_all((1..=50).map(|n| TestUnit {
            delay: Duration::from_millis(20),
            ..TestUnit::plain(n)
        }));
        pool.cancel();

        let results = tokio::time::timeout(Duration::from_secs(2), pool.run_to_completion())
            .await
            .expect("cancelled pool must still terminate")
            .unwrap();
        assert!(results.len() < 50);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_dropped() {
        let mut pool = WorkerPool::new(2, run_unit);
        pool.submit_all((1..=3).map(TestUnit::plain));
        pool.shutdown();
        assert_eq!(pool.submit_all((4..=6).map(TestUnit::plain)), 0);

        let results = pool.run_to_completion().await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::<()>::Unreachable.label(), "unreachable");
        assert_eq!(
            Outcome::<()>::ProtocolError("boom".into()).to_string(),
            "protocol error: boom"
        );
    }
}
