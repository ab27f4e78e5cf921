//! Blocking primitives scenarios are built from.
//!
//! None of these spawn anything. Apart from deadline-carrying [`CancelToken`]s they work on
//! any executor.

mod barrier;
mod cancel;
mod rendezvous;

pub use barrier::CountingBarrier;
pub use cancel::{CancelHandle, CancelReason, CancelToken};
pub use rendezvous::Rendezvous;
