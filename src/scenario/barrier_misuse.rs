//! Waiting on a barrier from inside the loop that is still adding contributors.
//!
//! A coordinator registers one contributor per character of [`INPUT`] and spawns a worker for
//! each. The buggy coordinator waits inside the loop: right after the first worker is spawned
//! the count is still three, and the workers that would bring it to zero have not been spawned
//! yet, so the wait never returns. The fixed coordinator spawns every worker first and waits
//! once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::HarnessResult;
use crate::outcome::Observation;
use crate::scenario::{ScenarioContext, Variant};
use crate::sync::CountingBarrier;

/// One worker per character.
pub const INPUT: &str = "abcd";

pub(crate) fn buggy(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Buggy).boxed()
}

pub(crate) fn fixed(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Fixed).boxed()
}

async fn run(ctx: ScenarioContext, variant: Variant) -> HarnessResult<Observation> {
    let workers = ctx.clone();
    let coordinator = ctx.spawn("coordinator", async move {
        let finished = Arc::new(AtomicUsize::new(0));
        let group = CountingBarrier::new(INPUT.len());

        for name in INPUT.chars() {
            let done = group.clone();
            let finished = Arc::clone(&finished);
            workers.spawn(format!("worker-{}", name), async move {
                finished.fetch_add(1, Ordering::SeqCst);
                done.done();
            });

            if variant == Variant::Buggy {
                group.wait().await;
            }
        }

        if variant == Variant::Fixed {
            group.wait().await;
        }

        let completions = finished.load(Ordering::SeqCst);

        #[cfg(feature = "tracing")]
        debug!(completions, "barrier released");

        completions
    });

    Ok(Observation::Completions(coordinator.join().await?))
}
