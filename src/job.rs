//! Job trait and error types.
//!
//! The `Job` trait is the unit of work driven by the scheduler.
//! Implement this trait to define the recurring operation.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during a job run.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The recurring operation driven by a [`Scheduler`](crate::Scheduler).
///
/// The scheduler invokes `run` with no arguments, awaits its settlement, and
/// never retries it. A returned error is not propagated to `start`/`stop`
/// callers; it is forwarded to the delay policy as part of the
/// previous-execution metadata.
///
/// A job wanting a timeout must build it into `run` itself — the scheduler
/// never cancels a run that has started.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use pacer::{Job, JobError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Job for Heartbeat {
///     async fn run(&self) -> Result<(), JobError> {
///         // ping upstream, sync state, ...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync {
    /// Execute one run of the job.
    ///
    /// # Returns
    /// * `Ok(())` - Run completed successfully
    /// * `Err(JobError)` - Run failed
    async fn run(&self) -> Result<(), JobError>;

    /// Optional description for display/logging purposes.
    fn description(&self) -> Option<&str> {
        None
    }
}
