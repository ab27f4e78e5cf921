//! Every buggy variant shows its hazard; every fixed variant is clean

use racetrap::scenario::captured_variable;
use racetrap::{AssertionSink, CancelReason, HarnessError, Observation, Outcome, PanicSink};
use test_case::test_case;

use crate::common::{quick_harness, RecordingSink};

#[test_case("rendezvous_block/buggy", 1 ; "rendezvous block strands the producer")]
#[test_case("barrier_misuse/buggy", 1 ; "barrier misuse strands the coordinator")]
#[test_case("cancellation_race/buggy", 1 ; "cancellation race strands the waiter")]
#[test_case("lock_channel_deadlock/buggy", 2 ; "lock channel deadlock strands both units")]
#[tokio::test(flavor = "multi_thread")]
async fn test_buggy_variant_hangs_and_leaks(name: &str, leaked: usize) {
    let report = quick_harness().run_named(name).await.unwrap();

    assert_eq!(report.guard, Outcome::TimedOut, "{}", name);
    assert_eq!(report.leaked(), leaked, "{}: {}", name, report.leaks);
    assert_eq!(report.outcome(), Outcome::TimedOut);
}

#[test_case("rendezvous_block/fixed", Observation::Value(42))]
#[test_case("barrier_misuse/fixed", Observation::Completions(4))]
#[test_case(
    "cancellation_race/fixed",
    Observation::Cancelled(CancelReason::Cancelled)
)]
#[test_case("lock_channel_deadlock/fixed", Observation::Value(42))]
#[tokio::test(flavor = "multi_thread")]
async fn test_fixed_variant_completes_cleanly(name: &str, expected: Observation) {
    let report = quick_harness().run_named(name).await.unwrap();

    assert_eq!(report.outcome(), Outcome::Completed(expected), "{}", name);
    assert!(report.leaks.is_clean(), "{}: {}", name, report.leaks);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_captured_variable_pair() {
    let harness = quick_harness();

    let buggy = harness
        .run_named("captured_variable_race/buggy")
        .await
        .unwrap();
    match buggy.outcome() {
        Outcome::Completed(Observation::Labels(labels)) => {
            assert_eq!(labels.len(), 5);
            assert!(labels.iter().all(|label| label == "job-21"), "{:?}", labels);
        }
        other => panic!("expected labels, got {:?}", other),
    }

    let fixed = harness
        .run_named("captured_variable_race/fixed")
        .await
        .unwrap();
    match fixed.outcome() {
        Outcome::Completed(Observation::Labels(mut labels)) => {
            labels.sort();
            assert_eq!(labels, captured_variable::expected_labels());
        }
        other => panic!("expected labels, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verify_whole_catalog_with_panic_sink() {
    let harness = quick_harness();
    for scenario in racetrap::catalog() {
        harness.verify(&scenario, &PanicSink).await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_catalog_runs_agree_with_polarity() {
    let sink = RecordingSink::new();
    let reports = quick_harness().run_catalog().await.unwrap();

    for (scenario, report) in racetrap::catalog().iter().zip(&reports) {
        assert_eq!(scenario.name(), report.scenario);
        if let Err(message) = scenario.check(report) {
            sink.fail(&message);
        }
    }
    assert!(sink.is_clean(), "{:?}", sink.failures());
}

#[tokio::test]
async fn test_unknown_scenario_name() {
    match quick_harness().run_named("no_such_hazard/buggy").await {
        Err(HarnessError::UnknownScenario { name }) => assert_eq!(name, "no_such_hazard/buggy"),
        other => panic!("expected UnknownScenario, got {:?}", other.map(|r| r.scenario)),
    }
}
