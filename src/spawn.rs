//! Runtime-agnostic unit launcher.
//!
//! Every background unit the harness starts goes through a [`Spawner`]. The spawner is just a
//! function that hands a boxed future to whatever executor the test runs on, so the
//! primitives and the registry do not care which runtime drives them.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

/// Hands futures to an executor.
///
/// # Examples
///
/// ```no_run
/// use racetrap::Spawner;
///
/// // Tokio
/// let spawner = Spawner::tokio();
///
/// // Smol, or anything else that can run a 'static future to completion
/// let spawner = Spawner::new(|fut| smol::spawn(fut).detach());
/// ```
#[derive(Clone)]
pub struct Spawner {
    inner: Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>,
}

impl Spawner {
    /// Wrap an arbitrary spawn function.
    pub fn new<S>(spawner: S) -> Self
    where
        S: Fn(BoxFuture<'static, ()>) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(spawner),
        }
    }

    /// Spawn onto the tokio runtime that is current when [`Spawner::spawn`] is called.
    pub fn tokio() -> Self {
        Self::new(|fut| {
            tokio::spawn(fut);
        })
    }

    /// Launch `fut` as an independently scheduled unit.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        (self.inner)(fut.boxed())
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner").finish_non_exhaustive()
    }
}
