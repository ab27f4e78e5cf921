//! Leak detection composed with the guard

use std::time::Duration;

use racetrap::{
    assert_no_leak, detect_leaks, run_with_timeout, CancelToken, Outcome, Rendezvous, Spawner,
    TaskRegistry,
};

use crate::common::{stuck, RecordingSink};

#[tokio::test(flavor = "multi_thread")]
async fn test_guarded_join_of_stranded_producer() {
    let spawner = Spawner::tokio();
    let registry = TaskRegistry::new(spawner.clone());
    let handoff = Rendezvous::unbuffered();

    let (outcome, leaks) = detect_leaks(&registry, Duration::from_millis(20), async {
        let tx = handoff.clone();
        let producer = registry.spawn("producer", async move { tx.send(42).await });
        run_with_timeout(&spawner, Duration::from_millis(50), producer.join()).await
    })
    .await;

    assert_eq!(outcome, Outcome::TimedOut);
    assert_eq!(leaks.names(), vec!["producer"]);
    // The guard's own unit is not tracked.
    assert_eq!(registry.live_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_every_stranded_unit_is_reported_once() {
    let registry = TaskRegistry::new(Spawner::tokio());

    let (_, leaks) = detect_leaks(&registry, Duration::from_millis(10), async {
        for i in 0..3 {
            drop(registry.spawn(format!("stuck-{}", i), stuck()));
        }
        registry.spawn("fine", async {}).join().await.unwrap();
    })
    .await;

    assert_eq!(leaks.count(), 3);
    assert_eq!(leaks.names(), vec!["stuck-0", "stuck-1", "stuck-2"]);
    assert!(leaks.to_string().starts_with("3 unit(s) outlived their scope"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_released_units_are_not_leaks() {
    let registry = TaskRegistry::new(Spawner::tokio());
    let sink = RecordingSink::new();
    let (gate, open) = CancelToken::new();

    assert_no_leak(
        &registry,
        Duration::from_millis(20),
        async {
            for i in 0..4 {
                let gate = gate.clone();
                drop(registry.spawn(format!("gated-{}", i), async move {
                    gate.wait().await;
                }));
            }
            open.cancel();
        },
        &sink,
    )
    .await;

    assert!(sink.is_clean(), "{:?}", sink.failures());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_assert_no_leak_names_the_culprit() {
    let registry = TaskRegistry::new(Spawner::tokio());
    let sink = RecordingSink::new();

    assert_no_leak(
        &registry,
        Duration::ZERO,
        async {
            drop(registry.spawn("orphan", stuck()));
        },
        &sink,
    )
    .await;

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("orphan#0"));
}
