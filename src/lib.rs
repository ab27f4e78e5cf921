//! Concurrency Hazard Harness
//!
//! A small framework for reproducing classic concurrency bugs on demand, bounding them so they
//! cannot hang a test run, and proving that the fixed version of each bug no longer shows the
//! hazard.
//!
//! # Features
//!
//! - **Timeout guard**: [`run_with_timeout`] races a spawned task against a deadline and
//!   reports [`Outcome::TimedOut`] without cancelling the task. A unit stuck inside it stays
//!   stuck, where the leak detector can see it.
//! - **Leak detection**: a per-run [`TaskRegistry`] tracks every unit a scenario spawns.
//!   [`detect_leaks`] snapshots it before and after a body (plus a settle period) and reports
//!   what survived.
//! - **Primitives**: [`Rendezvous`] (unbuffered or buffered handoff with non-blocking
//!   attempts), [`CancelToken`] (broadcast cancellation with derived and deadline tokens), and
//!   [`CountingBarrier`] (wait-for-N-completions).
//! - **Catalog**: five hazards, each as a buggy and a fixed [`Scenario`] sharing one body.
//! - **Runtime-agnostic spawning**: units go through a [`Spawner`]; timers use `tokio::time`.
//!
//! # Quick Start
//!
//! ```no_run
//! use racetrap::{Harness, HarnessConfig, HazardKind, PanicSink, Scenario, Variant};
//!
//! # async {
//! let harness = Harness::new(HarnessConfig::from_env());
//!
//! for kind in HazardKind::ALL {
//!     // Buggy variants must show their hazard, fixed ones must complete without leaks.
//!     harness.verify(&Scenario::of(kind, Variant::Buggy), &PanicSink).await.unwrap();
//!     harness.verify(&Scenario::of(kind, Variant::Fixed), &PanicSink).await.unwrap();
//! }
//! # };
//! ```
//!
//! # Polarity
//!
//! A buggy scenario that reproduces its hazard is a *passing* observation. Hazards are cataloged
//! with the way they show up, see [`HazardKind::expected_hazard`]:
//!
//! - [`ExpectedHazard::Hang`]: the guard times out and at least one unit is left behind.
//! - [`ExpectedHazard::WrongResult`]: the scenario completes, with the wrong result.
//!
//! Fixed scenarios must always complete with the expected [`Observation`] and a clean
//! [`LeakReport`]. [`Scenario::check`] encodes both rules.
//!
//! # Building Blocks Directly
//!
//! ```no_run
//! use std::time::Duration;
//! use racetrap::{detect_leaks, run_with_timeout, Outcome, Rendezvous, Spawner, TaskRegistry};
//!
//! # async {
//! let spawner = Spawner::tokio();
//! let registry = TaskRegistry::new(spawner.clone());
//! let handoff = Rendezvous::unbuffered();
//!
//! let (outcome, leaks) = detect_leaks(&registry, Duration::from_millis(50), async {
//!     let tx = handoff.clone();
//!     let producer = registry.spawn("producer", async move { tx.send(42).await });
//!     // Joining a producer nobody receives from never finishes.
//!     run_with_timeout(&spawner, Duration::from_millis(100), producer.join()).await
//! })
//! .await;
//!
//! assert_eq!(outcome, Outcome::TimedOut);
//! assert_eq!(leaks.count(), 1);
//! # };
//! ```
//!
//! # Error Handling
//!
//! Expected hazards are values ([`Outcome`], [`LeakReport`]), never errors. [`HarnessError`]
//! covers failures of the harness itself: a joined unit that panicked ([`UnitLost`]), an
//! unknown scenario name, a configuration that cannot work. Genuine misuse of a primitive, such
//! as a barrier driven below zero, is fatal and panics with a [`UsageError`].
//!
//! # Configuration
//!
//! [`HarnessConfig`] holds the guard deadline, the settle period, and the scenario delays.
//! [`HarnessConfig::from_env`] reads `RACETRAP_DEADLINE_MS`, `RACETRAP_SETTLE_MS` and
//! `RACETRAP_WORK_DELAY_MS`.
//!
//! # Optional Tracing Support
//!
//! Enable the `tracing` feature to get structured events from the harness: run start and end
//! at INFO, unit spawns and primitive state changes at DEBUG/TRACE, timeouts and leaks at WARN.
//! When the feature is off every call site is compiled out.
//!
//! ```bash
//! RUST_LOG=racetrap=debug cargo test --features tracing
//! ```

mod config;
mod error;
mod guard;
mod harness;
mod outcome;
mod registry;
pub mod scenario;
mod sink;
mod spawn;
pub mod sync;

pub use config::{HarnessConfig, ScenarioTiming};
pub use error::{HarnessError, HarnessResult, SendError, TrySendError, UnitLost, UsageError};
pub use guard::run_with_timeout;
pub use harness::Harness;
pub use outcome::{Observation, Outcome, RunReport};
pub use registry::{
    assert_no_leak, detect_leaks, LeakReport, LiveSet, TaskRegistry, UnitHandle, UnitId,
};
pub use scenario::{catalog, ExpectedHazard, HazardKind, Scenario, ScenarioContext, Variant};
pub use sink::{AssertionSink, PanicSink};
pub use spawn::Spawner;
pub use sync::{CancelHandle, CancelReason, CancelToken, CountingBarrier, Rendezvous};
