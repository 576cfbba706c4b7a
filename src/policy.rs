//! Delay policy configuration.
//!
//! After every run the scheduler asks a [`DelayPolicy`] how long to wait
//! before the next one, handing it what the previous run did: how long it
//! took and whether it failed. Retry/backoff behavior lives entirely here,
//! not in the scheduler.

use std::time::Duration;

use crate::job::JobError;

/// Boxed error returned by a failing delay policy.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Metadata about the run that just finished, handed to [`DelayPolicy`].
///
/// Constructed fresh before every `next_delay` call and discarded after.
/// `duration` is `None` exactly once per session: for the first arm after
/// `start`, when no run has happened yet.
#[derive(Debug, Default)]
pub struct PreviousExecution {
    /// Elapsed time of the previous run, or `None` when there is no
    /// previous run (the first arm of a session).
    pub duration: Option<Duration>,

    /// The error the previous run settled with, if any.
    pub error: Option<JobError>,
}

impl PreviousExecution {
    /// Metadata for the first arm of a session: no previous run.
    pub fn none() -> Self {
        Self::default()
    }

    /// Metadata for a settled run.
    pub fn finished(duration: Duration, error: Option<JobError>) -> Self {
        Self {
            duration: Some(duration),
            error,
        }
    }

    /// Check whether this describes an actual previous run.
    pub fn has_previous(&self) -> bool {
        self.duration.is_some()
    }
}

/// Computes the delay before the next run.
///
/// Called synchronously by the scheduler once before the first run of a
/// session (with [`PreviousExecution::none`]) and once after every run
/// settles. It must not fail under normal operation: a returned error is
/// fatal to the session (see [`Scheduler`](crate::Scheduler) docs).
///
/// Any `Fn(&PreviousExecution) -> Result<Duration, BoxError>` closure
/// implements this trait:
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use pacer::Scheduler;
///
/// let scheduler = Scheduler::new(my_job, Arc::new(|prev: &pacer::PreviousExecution| {
///     // back off harder after a failure
///     if prev.error.is_some() {
///         Ok(Duration::from_secs(30))
///     } else {
///         Ok(Duration::from_secs(5))
///     }
/// }));
/// ```
pub trait DelayPolicy: Send + Sync {
    /// Compute the delay before the next run.
    fn next_delay(&self, prev: &PreviousExecution) -> Result<Duration, BoxError>;
}

impl<F> DelayPolicy for F
where
    F: Fn(&PreviousExecution) -> Result<Duration, BoxError> + Send + Sync,
{
    fn next_delay(&self, prev: &PreviousExecution) -> Result<Duration, BoxError> {
        self(prev)
    }
}

/// A policy that always returns the same delay, regardless of the previous
/// run's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a fixed-delay policy.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Get the configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl DelayPolicy for FixedDelay {
    fn next_delay(&self, _prev: &PreviousExecution) -> Result<Duration, BoxError> {
        Ok(self.delay)
    }
}
