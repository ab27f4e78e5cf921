//! Synchronous or bounded handoff point.
//!
//! A [`Rendezvous`] behaves like a channel with a fixed capacity. With capacity zero every
//! `send` waits until a receiver has actually taken the value, which is the shape that leaves a
//! sender stranded forever when its receiver gives up. With a buffer the sender can finish and
//! exit before anyone receives.
//!
//! Internally every value sits in a queue as an *offer*. An offer whose sender has already been
//! released occupies a buffer slot; an offer that still carries an acknowledgement belongs to a
//! sender that is blocked. Receiving takes the oldest offer and, when that frees a slot, promotes
//! the oldest blocked offer into it.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;
use tokio::sync::Notify;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::error::{SendError, TrySendError};

type Ack<T> = oneshot::Sender<Result<(), T>>;

struct Offer<T> {
    id: u64,
    value: T,
    // Some while the sender is blocked on this offer
    ack: Option<Ack<T>>,
}

struct State<T> {
    queue: VecDeque<Offer<T>>,
    waiting_receivers: usize,
    closed: bool,
    next_offer: u64,
}

impl<T> State<T> {
    fn placed(&self) -> usize {
        self.queue.iter().filter(|offer| offer.ack.is_none()).count()
    }

    fn push(&mut self, value: T, ack: Option<Ack<T>>) -> u64 {
        let id = self.next_offer;
        self.next_offer += 1;
        self.queue.push_back(Offer { id, value, ack });
        id
    }

    fn take_front(&mut self, capacity: usize) -> Option<T> {
        let mut offer = self.queue.pop_front()?;
        if let Some(ack) = offer.ack.take() {
            // The sender may have given up already; the value is still delivered.
            let _ = ack.send(Ok(()));
        }
        self.promote(capacity);
        Some(offer.value)
    }

    fn promote(&mut self, capacity: usize) {
        let mut placed = self.placed();
        for offer in self.queue.iter_mut() {
            if placed >= capacity {
                break;
            }
            if let Some(ack) = offer.ack.take() {
                let _ = ack.send(Ok(()));
                placed += 1;
            }
        }
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    offered: Notify,
    capacity: usize,
}

/// A handoff point shared by any number of senders and receivers.
///
/// Cloning yields another handle to the same handoff.
///
/// # Examples
///
/// ```
/// use racetrap::Rendezvous;
///
/// # tokio_test_block_on(async {
/// let handoff = Rendezvous::buffered(1);
///
/// // A buffer slot is free, so this completes without a receiver.
/// handoff.send(42).await.unwrap();
/// assert_eq!(handoff.recv().await, Some(42));
///
/// // Unbuffered: nobody is waiting, so a non-blocking attempt fails.
/// let strict = Rendezvous::unbuffered();
/// assert!(strict.try_send(1).is_err());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub struct Rendezvous<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Rendezvous<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Rendezvous")
            .field("capacity", &self.shared.capacity)
            .field("queued", &state.queue.len())
            .field("waiting_receivers", &state.waiting_receivers)
            .field("closed", &state.closed)
            .finish()
    }
}

// Removes a blocked offer if its sender stops waiting.
struct Withdraw<'a, T> {
    shared: &'a Shared<T>,
    id: u64,
    armed: bool,
}

impl<T> Drop for Withdraw<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.state.lock();
        if let Some(pos) = state
            .queue
            .iter()
            .position(|offer| offer.id == self.id && offer.ack.is_some())
        {
            state.queue.remove(pos);
        }
    }
}

// Keeps `waiting_receivers` honest even if a receive is abandoned mid-wait.
struct Waiting<'a, T> {
    shared: &'a Shared<T>,
}

impl<T> Drop for Waiting<'_, T> {
    fn drop(&mut self) {
        self.shared.state.lock().waiting_receivers -= 1;
    }
}

impl<T: Send> Rendezvous<T> {
    /// A strict handoff: `send` completes only once a receiver has the value.
    pub fn unbuffered() -> Self {
        Self::with_capacity(0)
    }

    /// A handoff that accepts up to `capacity` values without a receiver.
    pub fn buffered(capacity: usize) -> Self {
        Self::with_capacity(capacity)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    waiting_receivers: 0,
                    closed: false,
                    next_offer: 0,
                }),
                offered: Notify::new(),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Values currently buffered or offered by blocked senders.
    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Receivers currently parked in [`Rendezvous::recv`].
    pub fn waiting_receivers(&self) -> usize {
        self.shared.state.lock().waiting_receivers
    }

    /// Hand `value` over, waiting for a receiver or a free slot as needed.
    ///
    /// Nothing but a receiver (or [`Rendezvous::close`]) releases a blocked sender; in
    /// particular cancelling some token the sender's unit also holds does not.
    ///
    /// # Errors
    ///
    /// Returns the value in a [`SendError`] if the handoff is closed before it is accepted.
    pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
        let (id, accepted) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(SendError(value));
            }
            if state.placed() < self.shared.capacity {
                state.push(value, None);
                drop(state);
                self.shared.offered.notify_one();

                #[cfg(feature = "tracing")]
                trace!(capacity = self.shared.capacity, "value buffered");

                return Ok(());
            }
            let (tx, rx) = oneshot::channel();
            let id = state.push(value, Some(tx));
            (id, rx)
        };
        self.shared.offered.notify_one();

        #[cfg(feature = "tracing")]
        debug!(offer = id, "sender blocked awaiting a receiver");

        let mut withdraw = Withdraw {
            shared: &self.shared,
            id,
            armed: true,
        };
        let result = accepted.await;
        withdraw.armed = false;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(value)) => Err(SendError(value)),
            // The ack is only ever dropped after being answered.
            Err(oneshot::Canceled) => Ok(()),
        }
    }

    /// Offer `value` without waiting.
    ///
    /// Succeeds only if a buffer slot is free or a receiver is already parked in `recv`.
    ///
    /// The parked receiver is not reserved. If it abandons its `recv` (its future is dropped,
    /// for instance by a timeout) before taking the value, the value stays queued even on an
    /// unbuffered handoff: the next receiver gets it, and until then [`Rendezvous::len`] counts
    /// it and further `try_send` calls see the handoff as full.
    ///
    /// # Errors
    ///
    /// [`TrySendError::Full`] when the value would have to wait, [`TrySendError::Closed`] once
    /// the handoff is closed. Both hand the value back.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(TrySendError::Closed(value));
        }
        if state.placed() >= self.shared.capacity + state.waiting_receivers {
            return Err(TrySendError::Full(value));
        }
        state.push(value, None);
        drop(state);
        self.shared.offered.notify_one();
        Ok(())
    }

    /// Take the next value, waiting for one if necessary.
    ///
    /// Returns `None` once the handoff is closed and nothing is left to take.
    pub async fn recv(&self) -> Option<T> {
        loop {
            // Created before inspecting the state so a close in between is not missed.
            let offered = self.shared.offered.notified();
            {
                let mut state = self.shared.state.lock();
                if let Some(value) = state.take_front(self.shared.capacity) {
                    let more = !state.queue.is_empty();
                    drop(state);
                    if more {
                        // Pass the wakeup on; permits do not accumulate.
                        self.shared.offered.notify_one();
                    }
                    return Some(value);
                }
                if state.closed {
                    return None;
                }
                state.waiting_receivers += 1;
            }
            let _waiting = Waiting {
                shared: &self.shared,
            };
            offered.await;
        }
    }

    /// Take a value only if one is already on offer.
    pub fn try_recv(&self) -> Option<T> {
        self.shared
            .state
            .lock()
            .take_front(self.shared.capacity)
    }

    /// Close the handoff.
    ///
    /// Blocked senders get their values back as errors, parked receivers wake up, and values
    /// that were already buffered stay receivable. Closing twice is a no-op.
    pub fn close(&self) {
        let blocked: Vec<(T, Ack<T>)> = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let (blocked, kept): (VecDeque<_>, VecDeque<_>) = state
                .queue
                .drain(..)
                .partition(|offer| offer.ack.is_some());
            state.queue = kept;
            blocked
                .into_iter()
                .filter_map(|offer| offer.ack.map(|ack| (offer.value, ack)))
                .collect()
        };

        #[cfg(feature = "tracing")]
        debug!(failed_senders = blocked.len(), "rendezvous closed");

        for (value, ack) in blocked {
            let _ = ack.send(Err(value));
        }
        self.shared.offered.notify_waiters();
    }
}
