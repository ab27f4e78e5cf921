//! A blocking handoff performed while holding a lock the receiver also needs.
//!
//! The sender takes the lock and then hands 42 over. The receiver has to pass through the same
//! critical section before every receive. In the buggy variant the sender blocks on the send
//! with the lock still held, the receiver blocks on the lock, and neither ever moves again.
//! The fixed sender only attempts the handoff while it holds the lock; when no receiver is
//! ready it releases the lock first and sends afterwards.
//!
//! The lock and the handoff are independent primitives so the acquisition order stays the only
//! cause of the deadlock.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::time::sleep;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::{HarnessError, HarnessResult, TrySendError};
use crate::outcome::Observation;
use crate::scenario::{ScenarioContext, Variant};
use crate::sync::{CancelToken, Rendezvous};

pub(crate) fn buggy(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Buggy).boxed()
}

pub(crate) fn fixed(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Fixed).boxed()
}

async fn run(ctx: ScenarioContext, variant: Variant) -> HarnessResult<Observation> {
    let lock = Arc::new(Mutex::new(()));
    let handoff = Rendezvous::<i32>::unbuffered();
    // Fires once the sender is inside the critical section.
    let (held, signal_held) = CancelToken::new();

    let sender_lock = Arc::clone(&lock);
    let tx = handoff.clone();
    let head_start = ctx.timing().lock_delay;
    let sender = ctx.spawn("sender", async move {
        sleep(head_start).await;
        let guard = sender_lock.lock().await;
        signal_held.cancel();
        match variant {
            Variant::Buggy => {
                let _ = tx.send(42).await;
                drop(guard);
            }
            Variant::Fixed => {
                let pending = tx.try_send(42).err().map(TrySendError::into_inner);
                drop(guard);
                if let Some(value) = pending {
                    let _ = tx.send(value).await;
                }
            }
        }

        #[cfg(feature = "tracing")]
        debug!("sent");
    });

    let rx = handoff.clone();
    let receiver = ctx.spawn("receiver", async move {
        held.wait().await;
        let mut received = Vec::new();
        loop {
            drop(lock.lock().await);
            match rx.recv().await {
                Some(value) => received.push(value),
                None => break,
            }
        }
        received
    });

    sender.join().await?;
    handoff.close();
    let received = receiver.join().await?;

    #[cfg(feature = "tracing")]
    debug!(?received, "receiver drained");

    received
        .first()
        .copied()
        .map(Observation::Value)
        .ok_or(HarnessError::NothingReceived { what: "sender" })
}
