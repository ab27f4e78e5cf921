//! Live-unit registry and leak detection.
//!
//! A [`TaskRegistry`] is created per run and handed to whatever spawns background units. Every
//! unit spawned through it is *live* until its future is dropped, which happens when it
//! completes, when it panics, or when the runtime tears it down. Comparing two
//! [`LiveSet`] snapshots taken around a body tells which units outlived it.
//!
//! The registry only knows about units spawned through it, so the test framework's own tasks
//! (and the timeout guard's unit) are never counted. Because each run owns its registry, tests
//! running in parallel cannot see each other's units.
//!
//! This is an approximation: a leaked unit that happens to finish during the settle period is
//! not reported.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::error::UnitLost;
use crate::sink::AssertionSink;
use crate::spawn::Spawner;

/// Opaque unit identifier, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

struct Inner {
    live: Mutex<BTreeMap<UnitId, String>>,
    next_id: AtomicU64,
}

// Leaves the live set when the unit's future is dropped, however that happens.
struct LiveGuard {
    inner: Arc<Inner>,
    id: UnitId,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        let _name = self.inner.live.lock().remove(&self.id);

        #[cfg(feature = "tracing")]
        trace!(unit = self.id.0, name = ?_name, "unit left the live set");
    }
}

/// Tracks the background units spawned during one run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use racetrap::{detect_leaks, Rendezvous, Spawner, TaskRegistry};
///
/// # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
/// let registry = TaskRegistry::new(Spawner::tokio());
/// let handoff = Rendezvous::<i32>::unbuffered();
///
/// let (_, report) = detect_leaks(&registry, Duration::from_millis(20), async {
///     let tx = handoff.clone();
///     // Nobody ever receives, so this unit never finishes.
///     let _ = registry.spawn("stuck-sender", async move { tx.send(1).await });
/// })
/// .await;
///
/// assert_eq!(report.count(), 1);
/// assert_eq!(report.names(), vec!["stuck-sender"]);
/// # });
/// ```
#[derive(Clone)]
pub struct TaskRegistry {
    spawner: Spawner,
    inner: Arc<Inner>,
}

impl TaskRegistry {
    pub fn new(spawner: Spawner) -> Self {
        Self {
            spawner,
            inner: Arc::new(Inner {
                live: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Spawn `fut` as a tracked unit.
    ///
    /// The returned handle can be joined for the unit's value, or dropped without affecting the
    /// unit.
    pub fn spawn<F, T>(&self, name: impl Into<String>, fut: F) -> UnitHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = UnitId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        self.inner.live.lock().insert(id, name.clone());

        #[cfg(feature = "tracing")]
        debug!(unit = id.0, name = %name, "spawning tracked unit");

        let guard = LiveGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        let (tx, rx) = oneshot::channel();
        self.spawner.spawn(async move {
            let value = fut.await;
            // Leave the live set before a joiner can observe completion.
            drop(guard);
            let _ = tx.send(value);
        });

        UnitHandle { id, name, rx }
    }

    /// Units currently alive.
    pub fn snapshot(&self) -> LiveSet {
        LiveSet {
            units: self.inner.live.lock().clone(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner.live.lock().len()
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

/// Join handle for a tracked unit.
pub struct UnitHandle<T> {
    id: UnitId,
    name: String,
    rx: oneshot::Receiver<T>,
}

impl<T> UnitHandle<T> {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the unit's value.
    ///
    /// # Errors
    ///
    /// [`UnitLost`] if the unit panicked or was dropped before producing a value.
    pub async fn join(self) -> Result<T, UnitLost> {
        self.rx.await.map_err(|_| UnitLost { name: self.name })
    }
}

impl<T> std::fmt::Debug for UnitHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Point-in-time set of live units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSet {
    units: BTreeMap<UnitId, String>,
}

impl LiveSet {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Units alive now that were not alive in `baseline`.
    pub fn leaked_since(&self, baseline: &LiveSet) -> LeakReport {
        LeakReport {
            units: self
                .units
                .iter()
                .filter(|(id, _)| !baseline.units.contains_key(id))
                .map(|(id, name)| (*id, name.clone()))
                .collect(),
        }
    }
}

/// Units that outlived the scope they were spawned in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakReport {
    units: Vec<(UnitId, String)>,
}

impl LeakReport {
    pub fn count(&self) -> usize {
        self.units.len()
    }

    pub fn is_clean(&self) -> bool {
        self.units.is_empty()
    }

    /// Names of the leaked units, ordered by spawn order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|(_, name)| name.as_str()).collect()
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|(id, _)| *id).collect()
    }
}

impl std::fmt::Display for LeakReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return write!(f, "no leaked units");
        }
        write!(f, "{} unit(s) outlived their scope:", self.count())?;
        for (id, name) in &self.units {
            write!(f, " {}#{}", name, id.0)?;
        }
        Ok(())
    }
}

/// Run `body`, let things settle, and report the units it left behind.
///
/// The baseline is taken before `body` is first polled. `body` gets no deadline of its own;
/// compose with [`run_with_timeout`](crate::run_with_timeout) for that.
pub async fn detect_leaks<F, T>(registry: &TaskRegistry, settle: Duration, body: F) -> (T, LeakReport)
where
    F: Future<Output = T>,
{
    let baseline = registry.snapshot();
    let value = body.await;
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    let report = registry.snapshot().leaked_since(&baseline);

    #[cfg(feature = "tracing")]
    if !report.is_clean() {
        warn!(leaked = report.count(), names = ?report.names(), "units outlived their scope");
    }

    (value, report)
}

/// [`detect_leaks`], signalling `sink` if anything leaked.
pub async fn assert_no_leak<F, T, S>(
    registry: &TaskRegistry,
    settle: Duration,
    body: F,
    sink: &S,
) -> T
where
    F: Future<Output = T>,
    S: AssertionSink + ?Sized,
{
    let (value, report) = detect_leaks(registry, settle, body).await;
    sink.require(report.is_clean(), &report.to_string());
    value
}
