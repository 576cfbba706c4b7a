//! Scheduler engine implementation.
//!
//! The scheduler drives one recurring job and guarantees two properties:
//! - No two runs of the job ever overlap.
//! - `stop` does not return until any in-flight run has settled.
//!
//! The interval between runs is not fixed: after every run the configured
//! [`DelayPolicy`] is asked for the next delay, observing the run's duration
//! and any error it raised.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::job::Job;
use crate::policy::{DelayPolicy, PreviousExecution};

use super::types::{SchedulerError, SchedulerStatus};

/// Registers guarded by the scheduler's single lock.
///
/// At most one `pending_timer` and at most one `in_flight` signal exist at
/// any time; all transitions between them happen inside one critical section,
/// which is what makes the no-overlap guarantee structural.
struct Inner {
    status: SchedulerStatus,
    /// Armed timer for the next run, if any. Aborting the handle cancels the
    /// timer; the handle is only ever aborted before the run routine begins.
    pending_timer: Option<JoinHandle<()>>,
    /// Settlement signal for the run currently in flight, if any. The sender
    /// side lives in the run routine; waiters clone this receiver.
    in_flight: Option<watch::Receiver<bool>>,
    /// Fatal delay-policy error recorded when a session ends abnormally.
    fault: Option<SchedulerError>,
}

/// State shared between the scheduler handle and its spawned timer tasks.
struct Shared {
    job: Arc<dyn Job>,
    policy: Arc<dyn DelayPolicy>,
    inner: Mutex<Inner>,
}

/// Recurring scheduler for a single job.
///
/// Constructed once with its two collaborators, then started and stopped any
/// number of times; each start/stop pair is a session. Cloning the scheduler
/// yields another handle to the same instance.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use pacer::{FixedDelay, Scheduler};
///
/// let scheduler = Scheduler::new(
///     Arc::new(my_job),
///     Arc::new(FixedDelay::new(Duration::from_secs(5))),
/// );
/// scheduler.start().await?;
/// // ...
/// scheduler.stop().await; // returns only after any in-flight run settles
/// ```
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler for the given job and delay policy.
    pub fn new(job: Arc<dyn Job>, policy: Arc<dyn DelayPolicy>) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                policy,
                inner: Mutex::new(Inner {
                    status: SchedulerStatus::Inactive,
                    pending_timer: None,
                    in_flight: None,
                    fault: None,
                }),
            }),
        }
    }

    /// Begin a session: arm the first timer and go active.
    ///
    /// The first delay is computed from [`PreviousExecution::none`], since no
    /// run has happened yet. Idempotent: calling `start` while already active
    /// is a no-op. Calling it while a stop is still waiting on an in-flight
    /// run first waits for that run to settle and then re-evaluates, so a
    /// concurrent stop/restart pair can never double-arm the timer or
    /// double-invoke the job.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DelayPolicy`] if the policy fails while
    /// computing the first delay; the scheduler stays inactive.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        loop {
            let waiter = {
                let mut inner = self.shared.inner.lock().await;
                match inner.status {
                    SchedulerStatus::Active => return Ok(()),
                    SchedulerStatus::Inactive => {
                        let delay = self
                            .shared
                            .policy
                            .next_delay(&PreviousExecution::none())
                            .map_err(SchedulerError::DelayPolicy)?;
                        inner.status = SchedulerStatus::Active;
                        Shared::arm_timer(&self.shared, &mut inner, delay);
                        tracing::debug!(?delay, "session started");
                        return Ok(());
                    }
                    SchedulerStatus::Terminating => match inner.in_flight.clone() {
                        Some(rx) => Some(rx),
                        None => {
                            // The run already settled and only the final
                            // transition is pending; either caller may
                            // perform it.
                            inner.status = SchedulerStatus::Inactive;
                            None
                        }
                    },
                }
            };

            if let Some(mut rx) = waiter {
                let _ = rx.wait_for(|settled| *settled).await;
            }
        }
    }

    /// End the session gracefully.
    ///
    /// Cancels the pending timer if one is armed (its firing will never
    /// occur), then waits for any in-flight run to settle before returning.
    /// A run already in progress is never cancelled, only awaited. No-op when
    /// the scheduler is already inactive; concurrent or repeated `stop` calls
    /// all resolve once the in-flight run settles.
    pub async fn stop(&self) {
        let waiter = {
            let mut inner = self.shared.inner.lock().await;
            match inner.status {
                SchedulerStatus::Inactive => return,
                SchedulerStatus::Active => {
                    if let Some(timer) = inner.pending_timer.take() {
                        timer.abort();
                    }
                    inner.status = SchedulerStatus::Terminating;
                    tracing::debug!("stop requested");
                    inner.in_flight.clone()
                }
                // A stop is already in progress; just wait with it.
                SchedulerStatus::Terminating => inner.in_flight.clone(),
            }
        };

        if let Some(mut rx) = waiter {
            let _ = rx.wait_for(|settled| *settled).await;
        }

        let mut inner = self.shared.inner.lock().await;
        if inner.status == SchedulerStatus::Terminating {
            inner.status = SchedulerStatus::Inactive;
            tracing::debug!("session ended");
        }
    }

    /// Wait for the run currently in flight, if any.
    ///
    /// Resolves immediately when no run is in flight, otherwise when the run
    /// settles, regardless of its success or failure. Never alters status or
    /// cancels anything; any number of callers may wait concurrently.
    pub async fn wait_until_idle(&self) {
        let waiter = self.shared.inner.lock().await.in_flight.clone();
        if let Some(mut rx) = waiter {
            let _ = rx.wait_for(|settled| *settled).await;
        }
    }

    /// Get the current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        self.shared.inner.lock().await.status
    }

    /// Check if a run is currently in flight.
    pub async fn is_currently_executing(&self) -> bool {
        self.shared.inner.lock().await.in_flight.is_some()
    }

    /// Retrieve and clear a recorded fatal delay-policy fault.
    ///
    /// When the policy fails after a run (detached from any caller's stack),
    /// the session ends and the error is recorded here instead of being lost.
    pub async fn take_fault(&self) -> Option<SchedulerError> {
        self.shared.inner.lock().await.fault.take()
    }
}

impl Shared {
    /// Arm the timer for the next run. Caller must hold the lock and have
    /// already set status to `Active`.
    fn arm_timer(shared: &Arc<Shared>, inner: &mut Inner, delay: Duration) {
        let task_shared = Arc::clone(shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Shared::fire(task_shared).await;
        });
        inner.pending_timer = Some(handle);
    }

    /// Timer-fired entry point: consume the timer, install the in-flight
    /// signal, then run the job.
    ///
    /// The signal is installed in the same critical section that consumes the
    /// timer handle, before the job is first polled, so every concurrent
    /// waiter can retrieve and await exactly this run's settlement. Once the
    /// handle is consumed a `stop` can no longer abort this task.
    async fn fire(shared: Arc<Shared>) {
        let done = {
            let mut inner = shared.inner.lock().await;
            // A stop may have been requested between the sleep elapsing and
            // this lock being acquired; the session ends without a run.
            if inner.status != SchedulerStatus::Active {
                return;
            }
            inner.pending_timer = None;
            let (tx, rx) = watch::channel(false);
            inner.in_flight = Some(rx);
            tx
        };
        Shared::run_and_reschedule(shared, done).await;
    }

    /// Run the job once, then compute the next delay and re-arm, unless a
    /// stop was requested while the run was in flight.
    async fn run_and_reschedule(shared: Arc<Shared>, done: watch::Sender<bool>) {
        let started = Instant::now();
        let result = shared.job.run().await;
        let elapsed = started.elapsed();

        {
            let mut inner = shared.inner.lock().await;
            inner.in_flight = None;

            match &result {
                Ok(()) => tracing::debug!(?elapsed, "run settled"),
                // The job's error is not propagated anywhere else; it is
                // forwarded to the delay policy below.
                Err(error) => tracing::debug!(?elapsed, %error, "run settled with error"),
            }

            if inner.status == SchedulerStatus::Active {
                let prev = PreviousExecution::finished(elapsed, result.err());
                match shared.policy.next_delay(&prev) {
                    Ok(delay) => Shared::arm_timer(&shared, &mut inner, delay),
                    Err(source) => {
                        // The policy is assumed infallible; continuing
                        // without a delay would be worse than ending the
                        // session loudly.
                        tracing::error!(error = %source, "delay policy failed, ending session");
                        inner.status = SchedulerStatus::Inactive;
                        inner.fault = Some(SchedulerError::DelayPolicy(source));
                    }
                }
            }
            // Status left as Terminating here is finalized by the waiting
            // stop call once the signal below settles.
        }

        let _ = done.send(true);
    }
}
