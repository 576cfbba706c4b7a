//! Testing utilities for users of the pacer library.
//!
//! This module provides helpers for testing scheduling behavior:
//!
//! - [`CountingJob`]: counts its runs, optionally taking a fixed duration
//! - [`ManualJob`]: stays pending until explicitly released
//! - [`FailingJob`]: fails N times then succeeds
//! - [`RecordingPolicy`]: records every delay computation it is asked for

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::job::{Job, JobError};
use crate::policy::{BoxError, DelayPolicy, PreviousExecution};

/// How long polling helpers wait before giving up.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll a condition until it holds.
///
/// More reliable than fixed sleeps since execution time can vary. Checks the
/// condition every 10ms.
///
/// # Panics
///
/// Panics if the condition does not hold within the timeout.
pub async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    loop {
        if condition().await {
            return;
        }
        if start.elapsed() > POLL_TIMEOUT {
            panic!("timeout waiting for condition");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A job that counts its runs and optionally takes a fixed duration.
///
/// # Example
///
/// ```ignore
/// use pacer::testing::CountingJob;
///
/// let job = CountingJob::new();
/// // ... drive it through a scheduler ...
/// assert_eq!(job.run_count(), 3);
/// ```
pub struct CountingJob {
    runs: AtomicU32,
    duration: Duration,
    settled: Notify,
}

impl CountingJob {
    /// Create a job that settles immediately.
    pub fn new() -> Arc<Self> {
        Self::with_duration(Duration::ZERO)
    }

    /// Create a job that takes `duration` to settle.
    pub fn with_duration(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicU32::new(0),
            duration,
            settled: Notify::new(),
        })
    }

    /// Number of runs that have settled.
    pub fn run_count(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` runs have settled.
    pub async fn wait_for_runs(&self, count: u32) {
        loop {
            // Register before checking so a settle between the check and the
            // await is not missed.
            let settled = self.settled.notified();
            if self.run_count() >= count {
                return;
            }
            settled.await;
        }
    }
}

#[async_trait]
impl Job for CountingJob {
    async fn run(&self) -> Result<(), JobError> {
        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.settled.notify_waiters();
        Ok(())
    }
}

/// A job that stays pending until explicitly released.
///
/// Each run blocks until a matching [`release`](ManualJob::release) call,
/// which makes it possible to observe the scheduler with a run held in
/// flight.
pub struct ManualJob {
    gate: Semaphore,
    started: AtomicU32,
    completed: AtomicU32,
    entered: Notify,
    settled: Notify,
}

impl ManualJob {
    /// Create a job whose runs block until released.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            started: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            entered: Notify::new(),
            settled: Notify::new(),
        })
    }

    /// Allow one pending (or future) run to settle.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Number of runs that have begun.
    pub fn start_count(&self) -> u32 {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of runs that have settled.
    pub fn run_count(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Wait until at least one run has begun.
    pub async fn wait_for_start(&self) {
        self.wait_for_starts(1).await;
    }

    /// Wait until at least `count` runs have begun.
    pub async fn wait_for_starts(&self, count: u32) {
        loop {
            let entered = self.entered.notified();
            if self.start_count() >= count {
                return;
            }
            entered.await;
        }
    }

    /// Wait until at least `count` runs have settled.
    pub async fn wait_for_runs(&self, count: u32) {
        loop {
            let settled = self.settled.notified();
            if self.run_count() >= count {
                return;
            }
            settled.await;
        }
    }
}

#[async_trait]
impl Job for ManualJob {
    async fn run(&self) -> Result<(), JobError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_waiters();

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| JobError::Other(Box::new(e)))?;
        permit.forget();

        self.completed.fetch_add(1, Ordering::SeqCst);
        self.settled.notify_waiters();
        Ok(())
    }
}

/// A job that fails a configurable number of times before succeeding.
///
/// Useful for testing delay policies that react to errors. Pass a large
/// `fail_count` for a job that always fails.
pub struct FailingJob {
    failures_remaining: AtomicU32,
    runs: AtomicU32,
    error_message: String,
    settled: Notify,
}

impl FailingJob {
    /// Create a job that fails `fail_count` times then succeeds.
    pub fn new(fail_count: u32) -> Arc<Self> {
        Self::with_error(fail_count, "intentional test failure")
    }

    /// Create a job that fails with a custom error message.
    pub fn with_error(fail_count: u32, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            failures_remaining: AtomicU32::new(fail_count),
            runs: AtomicU32::new(0),
            error_message: message.into(),
            settled: Notify::new(),
        })
    }

    /// Number of runs that have settled, successfully or not.
    pub fn run_count(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` runs have settled.
    pub async fn wait_for_runs(&self, count: u32) {
        loop {
            let settled = self.settled.notified();
            if self.run_count() >= count {
                return;
            }
            settled.await;
        }
    }
}

#[async_trait]
impl Job for FailingJob {
    async fn run(&self) -> Result<(), JobError> {
        let result = if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
        {
            Err(JobError::ExecutionFailed(self.error_message.clone()))
        } else {
            Ok(())
        };

        self.runs.fetch_add(1, Ordering::SeqCst);
        self.settled.notify_waiters();
        result
    }
}

/// A recorded delay computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Duration of the previous run, `None` for the first arm of a session.
    pub duration: Option<Duration>,
    /// Rendered error of the previous run, if it failed.
    pub error: Option<String>,
}

/// A policy wrapper that records every delay computation.
///
/// Wraps any inner [`DelayPolicy`] and snapshots the metadata of each call
/// so tests can assert what the scheduler reported.
pub struct RecordingPolicy {
    inner: Box<dyn DelayPolicy>,
    calls: std::sync::Mutex<Vec<RecordedCall>>,
}

impl RecordingPolicy {
    /// Record calls while delegating to `inner` for the actual delays.
    pub fn new(inner: impl DelayPolicy + 'static) -> Arc<Self> {
        Arc::new(Self {
            inner: Box::new(inner),
            calls: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Record calls while always returning the same delay.
    pub fn fixed(delay: Duration) -> Arc<Self> {
        Self::new(crate::policy::FixedDelay::new(delay))
    }

    /// Snapshot of all recorded calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock poisoned").len()
    }
}

impl DelayPolicy for RecordingPolicy {
    fn next_delay(&self, prev: &PreviousExecution) -> Result<Duration, BoxError> {
        self.calls.lock().expect("lock poisoned").push(RecordedCall {
            duration: prev.duration,
            error: prev.error.as_ref().map(|e| e.to_string()),
        });
        self.inner.next_delay(prev)
    }
}
