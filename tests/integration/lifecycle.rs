//! Session lifecycle integration tests.
//!
//! Tests that verify start/stop idempotency across sessions and the
//! metadata handed to the delay policy.

use pacer::testing::{CountingJob, RecordingPolicy};
use pacer::{FixedDelay, Scheduler, SchedulerStatus};
use std::sync::Arc;
use std::time::Duration;

use crate::common;

/// Test: A second `start` on an active scheduler arms nothing.
///
/// The job must not be invoked an extra time and no extra timer chain may
/// exist: every invocation is preceded by exactly one delay computation.
#[tokio::test]
async fn test_double_start_arms_a_single_timer_chain() {
    let job = CountingJob::new();
    let policy = RecordingPolicy::fixed(Duration::from_millis(20));
    let scheduler = Scheduler::new(job.clone(), policy.clone());

    scheduler.start().await.unwrap();
    scheduler.start().await.unwrap();

    job.wait_for_runs(3).await;
    scheduler.stop().await;

    let runs = job.run_count();
    let calls = policy.calls();

    // One initial arm for the session, then one computation per settled run.
    // A second chain would have produced a second no-previous call and more
    // computations than runs.
    let initial_arms = calls.iter().filter(|c| c.duration.is_none()).count();
    assert_eq!(initial_arms, 1);
    assert!(
        (calls.len() as u32) <= runs + 1,
        "more delay computations ({}) than runs ({}) plus the initial arm",
        calls.len(),
        runs
    );
}

/// Test: The first delay request of a session has no previous-execution
/// metadata; every subsequent request carries the real elapsed duration.
#[tokio::test]
async fn test_first_arm_has_no_previous_execution() {
    let job = CountingJob::with_duration(Duration::from_millis(50));
    let policy = RecordingPolicy::fixed(Duration::from_millis(10));
    let scheduler = Scheduler::new(job.clone(), policy.clone());

    scheduler.start().await.unwrap();
    job.wait_for_runs(2).await;
    scheduler.stop().await;

    let calls = policy.calls();
    // The stop may land before the second run's delay computation, so only
    // the initial arm plus the first post-run call are guaranteed.
    assert!(calls.len() >= 2);
    assert!(calls[0].duration.is_none(), "first arm must be synthetic");
    for call in &calls[1..] {
        let duration = call.duration.expect("post-run call must carry a duration");
        assert!(
            duration >= Duration::from_millis(50),
            "reported duration {:?} shorter than the job itself",
            duration
        );
        assert!(call.error.is_none());
    }
}

/// Test: Repeated `stop` calls on an inactive scheduler are no-ops and
/// resolve immediately.
#[tokio::test]
async fn test_repeated_stop_is_noop() {
    let scheduler = Scheduler::new(
        CountingJob::new(),
        Arc::new(FixedDelay::new(Duration::from_secs(60))),
    );

    scheduler.start().await.unwrap();
    scheduler.stop().await;

    let second_stop = std::time::Instant::now();
    scheduler.stop().await;
    scheduler.stop().await;
    let elapsed = second_stop.elapsed();

    assert_eq!(scheduler.status().await, SchedulerStatus::Inactive);
    assert!(
        elapsed < Duration::from_millis(100),
        "redundant stops should resolve immediately. Duration: {:?}",
        elapsed
    );
}

/// Test: `wait_until_idle` never blocks when no run is in flight and does
/// not disturb a running session.
#[tokio::test]
async fn test_wait_until_idle_is_a_pure_observer() {
    let job = CountingJob::with_duration(Duration::from_millis(100));
    let policy = RecordingPolicy::fixed(Duration::from_millis(20));
    let scheduler = Scheduler::new(job.clone(), policy.clone());

    // Idle before any session.
    scheduler.wait_until_idle().await;
    assert_eq!(scheduler.status().await, SchedulerStatus::Inactive);

    scheduler.start().await.unwrap();
    common::wait_until_executing(&scheduler, Duration::from_secs(1)).await;
    scheduler.wait_until_idle().await;

    // Observing a run must not have stopped the session.
    assert_eq!(scheduler.status().await, SchedulerStatus::Active);
    job.wait_for_runs(2).await;
    scheduler.stop().await;
}
