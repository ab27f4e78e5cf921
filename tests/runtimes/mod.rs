//! Runtime tests module
//!
//! The primitives, the registry and the leak detector (with a zero settle period) need no
//! timer, so they must work on any executor that can run a `'static` future.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use racetrap::{
    detect_leaks, CancelReason, CancelToken, CountingBarrier, Rendezvous, Spawner, TaskRegistry,
};
use test_case::test_case;


trait RuntimeTest {
    fn run_racetrap_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>;
}

struct SmolRuntimeTest;

impl RuntimeTest for SmolRuntimeTest {
    fn run_racetrap_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        smol::block_on(f(Spawner::new(|fut| smol::spawn(fut).detach())));
    }
}

struct FuturesExecutorRuntimeTest;

impl RuntimeTest for FuturesExecutorRuntimeTest {
    fn run_racetrap_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        let pool = futures_executor::ThreadPool::new().unwrap();

        futures_executor::block_on(f(Spawner::new(move |fut| pool.spawn_ok(fut))));
    }
}

// Runs every unit to completion inside the spawn call, so no unit may park on another.
struct PollsterRuntimeTest;

impl RuntimeTest for PollsterRuntimeTest {
    fn run_racetrap_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        pollster::block_on(f(Spawner::new(|fut| pollster::block_on(fut))));
    }
}

static ASYNC_EXECUTOR: async_executor::Executor = async_executor::Executor::new();

struct AsyncExecutorRuntimeTest;

impl RuntimeTest for AsyncExecutorRuntimeTest {
    fn run_racetrap_test<F>(self, f: impl FnOnce(Spawner) -> F)
    where
        F: Future<Output = ()>,
    {
        smol::future::block_on(
            ASYNC_EXECUTOR.run(f(Spawner::new(|fut| ASYNC_EXECUTOR.spawn(fut).detach()))),
        );
    }
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(PollsterRuntimeTest)]
#[test_case(AsyncExecutorRuntimeTest)]
fn test_workers_report_through_buffered_handoff(runner: impl RuntimeTest) {
    runner.run_racetrap_test(|spawner| async move {
        let registry = TaskRegistry::new(spawner);
        let results = Rendezvous::buffered(8);
        let group = CountingBarrier::new(8);

        for i in 0..8 {
            let results = results.clone();
            let done = group.clone();
            drop(registry.spawn(format!("worker-{}", i), async move {
                results.send(i * 2).await.unwrap();
                done.done();
            }));
        }
        group.wait().await;

        let mut got = Vec::new();
        while let Some(value) = results.try_recv() {
            got.push(value);
        }
        got.sort();
        assert_eq!(got, (0..8).map(|i| i * 2).collect::<Vec<_>>());
    });
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(PollsterRuntimeTest)]
#[test_case(AsyncExecutorRuntimeTest)]
fn test_cancelled_tree_is_observed_by_units(runner: impl RuntimeTest) {
    runner.run_racetrap_test(|spawner| async move {
        let registry = TaskRegistry::new(spawner);
        let (root, cancel_root) = CancelToken::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let children: Vec<_> = (0..4).map(|_| CancelToken::with_cancel(&root).0).collect();
        cancel_root.cancel();

        let mut units = Vec::new();
        for (i, child) in children.into_iter().enumerate() {
            let seen = Arc::clone(&seen);
            units.push(registry.spawn(format!("observer-{}", i), async move {
                let reason = child.wait().await;
                seen.fetch_add(1, Ordering::SeqCst);
                reason
            }));
        }
        for unit in units {
            assert_eq!(unit.join().await.unwrap(), CancelReason::Cancelled);
        }
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    });
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(AsyncExecutorRuntimeTest)]
fn test_unreceived_send_leaks_on_any_runtime(runner: impl RuntimeTest) {
    runner.run_racetrap_test(|spawner| async move {
        let registry = TaskRegistry::new(spawner);
        let handoff = Rendezvous::unbuffered();

        let (_, leaks) = detect_leaks(&registry, Duration::ZERO, async {
            let tx = handoff.clone();
            drop(registry.spawn("producer", async move { tx.send(42).await }));
        })
        .await;

        assert_eq!(leaks.names(), vec!["producer"]);

        // Receiving releases the producer.
        assert_eq!(handoff.recv().await, Some(42));
    });
}

#[test_case(SmolRuntimeTest)]
#[test_case(FuturesExecutorRuntimeTest)]
#[test_case(PollsterRuntimeTest)]
#[test_case(AsyncExecutorRuntimeTest)]
fn test_joined_units_leave_nothing_behind(runner: impl RuntimeTest) {
    runner.run_racetrap_test(|spawner| async move {
        let registry = TaskRegistry::new(spawner);

        let (sum, leaks) = detect_leaks(&registry, Duration::ZERO, async {
            let mut total = 0;
            for i in 1..=4 {
                let adder = registry.spawn(format!("adder-{}", i), async move { i });
                total += adder.join().await.unwrap();
            }
            total
        })
        .await;

        assert_eq!(sum, 10);
        assert!(leaks.is_clean());
    });
}
