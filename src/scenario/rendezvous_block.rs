//! A producer stranded on a handoff nobody will ever receive from.
//!
//! The producer works for `work_delay`, then hands 42 over. The consumer only waits
//! `bounded_wait` for it and then walks away. Without a buffer the producer's send can never
//! complete once the consumer is gone, so joining the producer hangs and the producer leaks.
//! With a single buffer slot the producer drops the value off and exits, and the consumer
//! picks it up afterwards.

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::{sleep, timeout};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::outcome::Observation;
use crate::scenario::{ScenarioContext, Variant};
use crate::sync::Rendezvous;

pub(crate) fn buggy(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Buggy).boxed()
}

pub(crate) fn fixed(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Fixed).boxed()
}

async fn run(ctx: ScenarioContext, variant: Variant) -> HarnessResult<Observation> {
    let timing = ctx.timing().clone();
    let handoff = match variant {
        Variant::Buggy => Rendezvous::unbuffered(),
        Variant::Fixed => Rendezvous::buffered(1),
    };

    let tx = handoff.clone();
    let work_delay = timing.work_delay;
    let producer = ctx.spawn("producer", async move {
        sleep(work_delay).await;
        let _ = tx.send(42).await;
    });

    if let Ok(Some(value)) = timeout(timing.bounded_wait, handoff.recv()).await {
        producer.join().await?;
        return Ok(Observation::Value(value));
    }

    #[cfg(feature = "tracing")]
    debug!(waited = ?timing.bounded_wait, "consumer gave up on the handoff");

    producer.join().await?;
    handoff
        .try_recv()
        .map(Observation::Value)
        .ok_or(HarnessError::NothingReceived { what: "producer" })
}
