//! Scheduler for one recurring job.
//!
//! This module provides the state machine that arms timers, runs the job
//! without overlap, and makes shutdown deterministic.

mod engine;
mod types;

pub use engine::Scheduler;
pub use types::{SchedulerError, SchedulerStatus};
