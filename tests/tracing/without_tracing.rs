//! Tests that the harness works the same with or without the tracing feature

use racetrap::{Observation, Outcome};

use crate::common::quick_harness;

#[tokio::test(flavor = "multi_thread")]
async fn test_fixed_barrier_without_subscriber() {
    let report = quick_harness()
        .run_named("barrier_misuse/fixed")
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::Completed(Observation::Completions(4)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_buggy_cancellation_without_subscriber() {
    let report = quick_harness()
        .run_named("cancellation_race/buggy")
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::TimedOut);
    assert_eq!(report.leaks.names(), vec!["waiter"]);
}
