//! Timeout guard.
//!
//! [`run_with_timeout`] spawns a task and races its completion against a deadline. When the
//! deadline wins the task is *not* cancelled: it keeps running (or keeps being stuck) after the
//! guard has returned, and the guard never waits on it again. That is what makes a stranded
//! unit observable to the leak detector afterwards.

use std::future::Future;
use std::task::Poll;
use std::time::Duration;

use futures::channel::oneshot;
use futures::{future, FutureExt};

#[cfg(feature = "tracing")]
use tracing::{trace, warn};

use crate::outcome::Outcome;
use crate::spawn::Spawner;

/// Run `task` as its own unit and report whether it finished within `deadline`.
///
/// Never panics and never returns [`Outcome::Leaked`]. A zero deadline still gives the task
/// one scheduling quantum: the guard waits for its first poll, then reports whatever that poll
/// produced. A task that panics never completes, so it is reported as [`Outcome::TimedOut`]
/// once the deadline passes.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use racetrap::{run_with_timeout, Outcome, Spawner};
///
/// # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
/// let spawner = Spawner::tokio();
///
/// let fast = run_with_timeout(&spawner, Duration::from_secs(1), async { 42 }).await;
/// assert_eq!(fast, Outcome::Completed(42));
///
/// let slow = run_with_timeout(&spawner, Duration::from_millis(10), async {
///     tokio::time::sleep(Duration::from_secs(5)).await;
/// })
/// .await;
/// assert_eq!(slow, Outcome::TimedOut);
/// # });
/// ```
pub async fn run_with_timeout<F, T>(spawner: &Spawner, deadline: Duration, task: F) -> Outcome<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (done_tx, mut done_rx) = oneshot::channel();
    let (polled_tx, polled_rx) = oneshot::channel::<()>();
    spawner.spawn(async move {
        let mut task = Box::pin(task);
        let mut done_tx = Some(done_tx);
        let mut polled_tx = Some(polled_tx);
        future::poll_fn(move |cx| {
            let ready = match task.as_mut().poll(cx) {
                Poll::Ready(value) => {
                    if let Some(tx) = done_tx.take() {
                        let _ = tx.send(value);
                    }
                    true
                }
                Poll::Pending => false,
            };
            // Fired after the value (if any) is already in `done_tx`.
            if let Some(tx) = polled_tx.take() {
                let _ = tx.send(());
            }
            if ready {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await;
    });

    if deadline.is_zero() {
        // A panic during the first poll drops the sender; that is still a miss.
        let _ = polled_rx.await;
        return match done_rx.try_recv() {
            Ok(Some(value)) => Outcome::Completed(value),
            _ => {
                #[cfg(feature = "tracing")]
                warn!("task did not finish within a zero deadline");

                Outcome::TimedOut
            }
        };
    }

    let mut expired = std::pin::pin!(tokio::time::sleep(deadline).fuse());
    let raced = futures::select! {
        result = done_rx => Some(result),
        _ = expired => None,
    };

    match raced {
        Some(Ok(value)) => {
            #[cfg(feature = "tracing")]
            trace!(?deadline, "task completed within deadline");

            Outcome::Completed(value)
        }
        Some(Err(oneshot::Canceled)) => {
            // The task died without a value; it can only ever be late.
            expired.as_mut().await;

            #[cfg(feature = "tracing")]
            warn!(?deadline, "task ended without a value");

            Outcome::TimedOut
        }
        None => {
            #[cfg(feature = "tracing")]
            warn!(?deadline, "deadline elapsed; task left running");

            Outcome::TimedOut
        }
    }
}
