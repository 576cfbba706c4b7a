//! Scheduler type definitions.
//!
//! This module contains the error type and status enum for the scheduler.

use thiserror::Error;

use crate::policy::BoxError;

/// Errors that can occur in the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The delay policy failed. This ends the session.
    #[error("delay policy failed: {0}")]
    DelayPolicy(BoxError),
}

/// Status of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// No timer armed and no run in flight. Initial and terminal status.
    Inactive,
    /// A timer is armed or a run is in flight.
    Active,
    /// A stop was requested while a run was in flight; no new timer may be
    /// armed. Waiting for the run to settle.
    Terminating,
}
