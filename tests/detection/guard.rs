//! Guard behavior through the public API

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use racetrap::{run_with_timeout, Outcome, Rendezvous, Spawner};

use crate::common::counting_spawner;

#[tokio::test(flavor = "multi_thread")]
async fn test_guard_returns_value_well_before_deadline() {
    let started = Instant::now();
    let outcome = run_with_timeout(&Spawner::tokio(), Duration::from_secs(5), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        "done"
    })
    .await;

    assert_eq!(outcome, Outcome::Completed("done"));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_guard_goes_through_the_given_spawner() {
    let (spawner, spawned) = counting_spawner();

    let outcome = run_with_timeout(&spawner, Duration::from_secs(1), async { 1 + 1 }).await;

    assert_eq!(outcome.completed(), Some(2));
    assert_eq!(spawned.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blocked_send_times_out_without_being_cancelled() {
    let handoff = Rendezvous::unbuffered();
    let tx = handoff.clone();

    let outcome =
        run_with_timeout(&Spawner::tokio(), Duration::from_millis(20), async move {
            tx.send(7).await
        })
        .await;
    assert!(outcome.is_timed_out());

    // Still parked in send: a late receiver gets the value.
    assert_eq!(handoff.recv().await, Some(7));
}

#[tokio::test]
async fn test_outcome_map_keeps_timeouts() {
    let outcome: Outcome<i32> = Outcome::TimedOut;
    assert_eq!(outcome.map(|v| v * 2), Outcome::TimedOut);
    assert_eq!(Outcome::Completed(2).map(|v| v * 2), Outcome::Completed(4));
    assert!(!Outcome::<()>::Leaked(1).is_completed());
}
