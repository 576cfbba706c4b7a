//! Single-job recurring scheduler with adaptive, run-aware delays.
//!
//! A [`Scheduler`] drives one [`Job`] repeatedly, asking a [`DelayPolicy`]
//! after every run how long to wait before the next one. Two guarantees hold
//! for every session: no two runs ever overlap, and [`Scheduler::stop`] does
//! not return until any in-flight run has settled.

pub mod job;
pub mod policy;
pub mod scheduler;
pub mod testing;

pub use job::{Job, JobError};
pub use policy::{BoxError, DelayPolicy, FixedDelay, PreviousExecution};
pub use scheduler::{Scheduler, SchedulerError, SchedulerStatus};
