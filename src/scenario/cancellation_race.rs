//! A waiter left watching a token nobody will cancel.
//!
//! A waiter starts waiting on a cancellable token. The owner then replaces its token with one
//! derived (with a timeout) from the common root, and cancels the replacement. In the buggy
//! variant the handle to the original token is lost in the swap, so the waiter is never
//! notified and joining it hangs. The fixed variant keeps the original handle and cancels it as
//! well; the barrier join then confirms the waiter saw the cancellation before the owner moves
//! on.

use futures::future::BoxFuture;
use futures::FutureExt;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::HarnessResult;
use crate::outcome::Observation;
use crate::scenario::{ScenarioContext, Variant};
use crate::sync::{CancelToken, CountingBarrier};

pub(crate) fn buggy(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Buggy).boxed()
}

pub(crate) fn fixed(ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
    run(ctx, Variant::Fixed).boxed()
}

async fn run(ctx: ScenarioContext, variant: Variant) -> HarnessResult<Observation> {
    let (root, _keep_root) = CancelToken::new();
    let (watched, cancel_watched) = CancelToken::with_cancel(&root);
    let observed = CountingBarrier::new(1);

    let waiter_token = watched.clone();
    let waiter_observed = observed.clone();
    let waiter = ctx.spawn("waiter", async move {
        let reason = waiter_token.wait().await;
        waiter_observed.done();
        reason
    });

    let (current, cancel_current) =
        CancelToken::with_timeout(&root, ctx.timing().cancel_timeout);
    let retired = match variant {
        Variant::Buggy => {
            // Overwritten by the swap; dropping a handle does not cancel anything.
            drop(cancel_watched);
            None
        }
        Variant::Fixed => Some(cancel_watched),
    };

    cancel_current.cancel();
    if let Some(cancel_watched) = retired {
        cancel_watched.cancel();
    }
    let _reason = current.wait().await;

    #[cfg(feature = "tracing")]
    debug!(reason = ?_reason, watched_done = watched.is_done(), "replacement token done");

    observed.wait().await;
    Ok(Observation::Cancelled(waiter.join().await?))
}
