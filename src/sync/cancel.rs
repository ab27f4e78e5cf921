//! One-shot, broadcast cancellation.
//!
//! A [`CancelToken`] is the observing side, a [`CancelHandle`] the triggering side. Tokens can
//! be derived from a parent: a derived token is done as soon as its parent is, or when its own
//! deadline passes, or when its own handle fires.
//!
//! Deadlines are tracked lazily. Nothing is spawned to fire them; [`CancelToken::is_done`]
//! compares against the clock and [`CancelToken::wait`] races the broadcast against a sleep.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Why a token is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// A handle fired (this token's or an ancestor's).
    Cancelled,
    /// A deadline on this token or an ancestor passed.
    DeadlineExceeded,
}

struct Node {
    state: watch::Sender<Option<CancelReason>>,
    deadline: Option<Instant>,
    children: Mutex<Vec<Weak<Node>>>,
}

impl Node {
    fn new(deadline: Option<Instant>) -> Arc<Self> {
        let (state, _) = watch::channel(None);
        Arc::new(Self {
            state,
            deadline,
            children: Mutex::new(Vec::new()),
        })
    }

    fn cancel(&self, reason: CancelReason) -> bool {
        let fired = self.state.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if fired {
            let children = std::mem::take(&mut *self.children.lock());
            for child in children.iter().filter_map(Weak::upgrade) {
                child.cancel(reason);
            }
        }
        fired
    }

    fn reason(&self) -> Option<CancelReason> {
        if let Some(reason) = *self.state.borrow() {
            return Some(reason);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.cancel(CancelReason::DeadlineExceeded);
                *self.state.borrow()
            }
            _ => None,
        }
    }
}

/// Observes a cancellation.
///
/// Cheap to clone; all clones observe the same signal.
#[derive(Clone)]
pub struct CancelToken {
    node: Arc<Node>,
}

/// Fires a cancellation. Cheap to clone.
#[derive(Clone)]
pub struct CancelHandle {
    node: Arc<Node>,
}

impl CancelToken {
    /// A fresh root token and the handle that cancels it.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (CancelToken, CancelHandle) {
        Self::pair(Node::new(None))
    }

    /// Derive a token that is also cancelled by its own handle.
    pub fn with_cancel(parent: &CancelToken) -> (CancelToken, CancelHandle) {
        Self::derive(parent, parent.node.deadline)
    }

    /// Derive a token that additionally expires once `timeout` has elapsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use racetrap::{CancelReason, CancelToken};
    ///
    /// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
    /// let (root, cancel_root) = CancelToken::new();
    /// let (child, _cancel_child) = CancelToken::with_timeout(&root, Duration::from_secs(60));
    ///
    /// cancel_root.cancel();
    /// assert_eq!(child.wait().await, CancelReason::Cancelled);
    /// # });
    /// ```
    pub fn with_timeout(parent: &CancelToken, timeout: Duration) -> (CancelToken, CancelHandle) {
        let own = Instant::now() + timeout;
        let deadline = match parent.node.deadline {
            Some(inherited) if inherited < own => inherited,
            _ => own,
        };
        Self::derive(parent, Some(deadline))
    }

    fn derive(parent: &CancelToken, deadline: Option<Instant>) -> (CancelToken, CancelHandle) {
        let node = Node::new(deadline);
        {
            let mut children = parent.node.children.lock();
            children.retain(|child| child.strong_count() > 0);
            children.push(Arc::downgrade(&node));
        }
        // The parent may have fired before the child was registered.
        if let Some(reason) = parent.node.reason() {
            node.cancel(reason);
        }
        Self::pair(node)
    }

    fn pair(node: Arc<Node>) -> (CancelToken, CancelHandle) {
        (
            CancelToken {
                node: Arc::clone(&node),
            },
            CancelHandle { node },
        )
    }

    pub fn is_done(&self) -> bool {
        self.node.reason().is_some()
    }

    /// Why the token is done, or `None` while it is still live.
    pub fn reason(&self) -> Option<CancelReason> {
        self.node.reason()
    }

    /// Wait until the token is done.
    ///
    /// Only a token that carries a deadline needs a timer; without one this works on any
    /// executor.
    pub async fn wait(&self) -> CancelReason {
        if let Some(reason) = self.node.reason() {
            return reason;
        }
        let mut observed = self.node.state.subscribe();
        match self.node.deadline {
            None => {
                // The sender lives in `self.node`, so this cannot fail.
                let _ = observed.wait_for(Option::is_some).await;
            }
            Some(deadline) => {
                tokio::select! {
                    _ = observed.wait_for(Option::is_some) => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        self.node.cancel(CancelReason::DeadlineExceeded);
                    }
                }
            }
        }
        self.node.reason().unwrap_or(CancelReason::Cancelled)
    }

    /// The instant this token expires, if it has a deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.node.deadline
    }
}

impl CancelHandle {
    /// Cancel the token and everything derived from it.
    ///
    /// Idempotent: returns `true` only for the call that actually cancelled. A token that has
    /// already expired is left as `DeadlineExceeded`.
    pub fn cancel(&self) -> bool {
        let fired = self.node.reason().is_none() && self.node.cancel(CancelReason::Cancelled);

        #[cfg(feature = "tracing")]
        debug!(fired, "cancel requested");

        fired
    }

    /// A token observing this handle.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            node: Arc::clone(&self.node),
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &*self.node.state.borrow())
            .field("deadline", &self.node.deadline)
            .finish()
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle").finish_non_exhaustive()
    }
}
