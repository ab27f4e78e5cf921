//! Cancellation trees

use std::time::Duration;

use racetrap::{CancelReason, CancelToken, Spawner, TaskRegistry};

#[tokio::test(flavor = "multi_thread")]
async fn test_root_cancel_reaches_every_descendant_waiter() {
    let registry = TaskRegistry::new(Spawner::tokio());
    let (root, cancel_root) = CancelToken::new();

    let mut waiters = Vec::new();
    for depth in 0..4 {
        let (child, _) = CancelToken::with_cancel(&root);
        let (leaf, _) = CancelToken::with_timeout(&child, Duration::from_secs(30));
        waiters.push(registry.spawn(format!("waiter-{}", depth), async move {
            (child.wait().await, leaf.wait().await)
        }));
    }

    cancel_root.cancel();
    for waiter in waiters {
        assert_eq!(
            waiter.join().await.unwrap(),
            (CancelReason::Cancelled, CancelReason::Cancelled)
        );
    }
}

#[tokio::test]
async fn test_swapped_token_without_its_handle_never_fires() {
    let (root, _cancel_root) = CancelToken::new();
    let (watched, cancel_watched) = CancelToken::with_cancel(&root);
    let (replacement, cancel_replacement) = CancelToken::with_timeout(&root, Duration::from_secs(5));

    drop(cancel_watched);
    cancel_replacement.cancel();

    assert_eq!(replacement.wait().await, CancelReason::Cancelled);
    assert!(!watched.is_done());
    assert!(tokio::time::timeout(Duration::from_millis(30), watched.wait())
        .await
        .is_err());
}

#[tokio::test]
async fn test_deadline_exceeded_is_distinguishable() {
    let (root, _cancel_root) = CancelToken::new();
    let (short, _) = CancelToken::with_timeout(&root, Duration::from_millis(5));
    let (long, cancel_long) = CancelToken::with_timeout(&root, Duration::from_secs(5));

    cancel_long.cancel();
    assert_eq!(short.wait().await, CancelReason::DeadlineExceeded);
    assert_eq!(long.wait().await, CancelReason::Cancelled);
}
