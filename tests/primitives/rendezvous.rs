//! Rendezvous handoff across spawned units

use std::time::Duration;

use racetrap::{Rendezvous, Spawner, TaskRegistry, TrySendError};
use tokio::time::timeout;

use crate::common::until;

#[tokio::test(flavor = "multi_thread")]
async fn test_unbuffered_pipeline_preserves_order() {
    let registry = TaskRegistry::new(Spawner::tokio());
    let handoff = Rendezvous::unbuffered();

    let tx = handoff.clone();
    let producer = registry.spawn("producer", async move {
        for i in 0..50 {
            tx.send(i).await.unwrap();
        }
        tx.close();
    });

    let mut got = Vec::new();
    while let Some(value) = handoff.recv().await {
        got.push(value);
    }
    producer.join().await.unwrap();

    assert_eq!(got, (0..50).collect::<Vec<_>>());
    assert_eq!(registry.live_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_consumer_that_gives_up_strands_unbuffered_producer() {
    let registry = TaskRegistry::new(Spawner::tokio());
    let handoff = Rendezvous::unbuffered();

    let tx = handoff.clone();
    let producer = registry.spawn("producer", async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(42).await
    });

    let early = timeout(Duration::from_millis(10), handoff.recv()).await;
    assert!(early.is_err());

    // The producer now sits in send with nobody left to receive.
    until(|| handoff.len() == 1).await;
    assert_eq!(registry.live_count(), 1);

    // Draining releases it.
    assert_eq!(handoff.try_recv(), Some(42));
    assert_eq!(producer.join().await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_buffered_slot_lets_producer_finish_first() {
    let registry = TaskRegistry::new(Spawner::tokio());
    let handoff = Rendezvous::buffered(1);

    let tx = handoff.clone();
    registry
        .spawn("producer", async move { tx.send(42).await })
        .join()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(handoff.try_recv(), Some(42));
}

#[tokio::test]
async fn test_try_send_reports_full_and_closed() {
    let handoff = Rendezvous::unbuffered();
    assert_eq!(handoff.try_send(1), Err(TrySendError::Full(1)));

    handoff.close();
    assert_eq!(handoff.try_send(2), Err(TrySendError::Closed(2)));
    assert_eq!(handoff.recv().await, None);
}
