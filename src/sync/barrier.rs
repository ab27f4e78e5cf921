//! Wait-for-N-completions barrier.
//!
//! Contributors are counted in with [`CountingBarrier::add`] and out with
//! [`CountingBarrier::done`]; [`CountingBarrier::wait`] resolves whenever the count is zero.
//! Nothing stops a caller from waiting before every contributor has been added, which is
//! exactly the misuse the barrier scenarios reproduce.

use std::sync::Arc;

use tokio::sync::watch;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::UsageError;

/// A shared outstanding-work counter. Clones share the count.
#[derive(Clone)]
pub struct CountingBarrier {
    count: Arc<watch::Sender<usize>>,
}

impl Default for CountingBarrier {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CountingBarrier {
    /// A barrier with `n` contributors outstanding.
    pub fn new(n: usize) -> Self {
        let (count, _) = watch::channel(n);
        Self {
            count: Arc::new(count),
        }
    }

    /// Adjust the outstanding count by `delta`.
    ///
    /// # Panics
    ///
    /// Panics with [`UsageError::BarrierUnderflow`] if the count would drop below zero.
    pub fn add(&self, delta: isize) {
        if let Err(err) = self.try_add(delta) {
            panic!("{}", err);
        }
    }

    /// Like [`CountingBarrier::add`], but reports underflow instead of panicking. The count is
    /// left untouched on error.
    ///
    /// # Errors
    ///
    /// [`UsageError::BarrierUnderflow`] if the count would drop below zero.
    pub fn try_add(&self, delta: isize) -> Result<(), UsageError> {
        let mut underflow = None;
        self.count.send_if_modified(|count| match count.checked_add_signed(delta) {
            Some(next) => {
                *count = next;
                delta != 0
            }
            None => {
                underflow = Some(UsageError::BarrierUnderflow {
                    count: *count,
                    delta,
                });
                false
            }
        });

        #[cfg(feature = "tracing")]
        trace!(delta, count = self.count(), "barrier adjusted");

        match underflow {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Count one contributor out.
    ///
    /// # Panics
    ///
    /// Panics if no contributor is outstanding.
    pub fn done(&self) {
        self.add(-1);
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until the outstanding count is zero.
    ///
    /// Returns immediately if it already is, even if more contributors are about to be added.
    pub async fn wait(&self) {
        let mut observed = self.count.subscribe();
        // The sender is owned by `self`, so the channel cannot close while we wait.
        let _ = observed.wait_for(|count| *count == 0).await;
    }
}

impl std::fmt::Debug for CountingBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingBarrier")
            .field("count", &self.count())
            .finish()
    }
}
