//! The hazard catalog.
//!
//! Every hazard comes as a pair of [`Scenario`]s, one [`Variant::Buggy`] and one
//! [`Variant::Fixed`]. Both forms of a pair share a single body that branches only at the point
//! where the bug lives, so they spawn the same units and have the same external shape. A test
//! can therefore drive both through identical harness code and assert opposite results.
//!
//! | Hazard | Buggy variant shows | Fixed variant yields |
//! |---|---|---|
//! | `rendezvous_block` | hang, stranded producer | `Value(42)` |
//! | `barrier_misuse` | hang, stranded coordinator | `Completions(4)` |
//! | `cancellation_race` | hang, stranded waiter | `Cancelled(Cancelled)` |
//! | `lock_channel_deadlock` | hang, both units stranded | `Value(42)` |
//! | `captured_variable_race` | wrong labels | `job-17` ..= `job-21` |

use std::future::Future;

use futures::future::BoxFuture;

use crate::config::ScenarioTiming;
use crate::error::{HarnessError, HarnessResult};
use crate::outcome::{Observation, Outcome, RunReport};
use crate::registry::{TaskRegistry, UnitHandle};
use crate::sync::CancelReason;

pub mod barrier_misuse;
pub mod cancellation_race;
pub mod captured_variable;
pub mod lock_channel;
pub mod rendezvous_block;

/// The classic bug a scenario reproduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HazardKind {
    RendezvousBlock,
    BarrierMisuse,
    CancellationRace,
    LockChannelDeadlock,
    CapturedVariableRace,
}

/// How the buggy variant of a hazard shows itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedHazard {
    /// The guard times out and at least one unit is left behind.
    Hang,
    /// The scenario completes cleanly but with the wrong result.
    WrongResult,
}

impl HazardKind {
    pub const ALL: [HazardKind; 5] = [
        HazardKind::RendezvousBlock,
        HazardKind::BarrierMisuse,
        HazardKind::CancellationRace,
        HazardKind::LockChannelDeadlock,
        HazardKind::CapturedVariableRace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HazardKind::RendezvousBlock => "rendezvous_block",
            HazardKind::BarrierMisuse => "barrier_misuse",
            HazardKind::CancellationRace => "cancellation_race",
            HazardKind::LockChannelDeadlock => "lock_channel_deadlock",
            HazardKind::CapturedVariableRace => "captured_variable_race",
        }
    }

    pub fn expected_hazard(self) -> ExpectedHazard {
        match self {
            HazardKind::CapturedVariableRace => ExpectedHazard::WrongResult,
            _ => ExpectedHazard::Hang,
        }
    }

    /// Whether `observation` is what the fixed variant must produce.
    pub fn fixed_holds(self, observation: &Observation) -> bool {
        match (self, observation) {
            (HazardKind::RendezvousBlock, Observation::Value(value)) => *value == 42,
            (HazardKind::BarrierMisuse, Observation::Completions(count)) => {
                *count == barrier_misuse::INPUT.len()
            }
            (HazardKind::CancellationRace, Observation::Cancelled(reason)) => {
                *reason == CancelReason::Cancelled
            }
            (HazardKind::LockChannelDeadlock, Observation::Value(value)) => *value == 42,
            (HazardKind::CapturedVariableRace, Observation::Labels(labels)) => {
                let mut labels = labels.clone();
                labels.sort();
                labels == captured_variable::expected_labels()
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for HazardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Buggy,
    Fixed,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Buggy => "buggy",
            Variant::Fixed => "fixed",
        }
    }
}

/// What a scenario body gets to work with.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    registry: TaskRegistry,
    timing: ScenarioTiming,
}

impl ScenarioContext {
    pub fn new(registry: TaskRegistry, timing: ScenarioTiming) -> Self {
        Self { registry, timing }
    }

    /// Spawn a unit the leak detector will account for.
    pub fn spawn<F, T>(&self, name: impl Into<String>, fut: F) -> UnitHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.registry.spawn(name, fut)
    }

    pub fn timing(&self) -> &ScenarioTiming {
        &self.timing
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

/// A scenario body.
pub type ScenarioFn = fn(ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>>;

/// One form of one hazard. Immutable and cheap to copy.
#[derive(Clone, Copy)]
pub struct Scenario {
    kind: HazardKind,
    variant: Variant,
    run: ScenarioFn,
}

impl Scenario {
    pub fn new(kind: HazardKind, variant: Variant, run: ScenarioFn) -> Self {
        Self { kind, variant, run }
    }

    /// The cataloged scenario for `kind` in its `variant` form.
    pub fn of(kind: HazardKind, variant: Variant) -> Self {
        let run: ScenarioFn = match (kind, variant) {
            (HazardKind::RendezvousBlock, Variant::Buggy) => rendezvous_block::buggy,
            (HazardKind::RendezvousBlock, Variant::Fixed) => rendezvous_block::fixed,
            (HazardKind::BarrierMisuse, Variant::Buggy) => barrier_misuse::buggy,
            (HazardKind::BarrierMisuse, Variant::Fixed) => barrier_misuse::fixed,
            (HazardKind::CancellationRace, Variant::Buggy) => cancellation_race::buggy,
            (HazardKind::CancellationRace, Variant::Fixed) => cancellation_race::fixed,
            (HazardKind::LockChannelDeadlock, Variant::Buggy) => lock_channel::buggy,
            (HazardKind::LockChannelDeadlock, Variant::Fixed) => lock_channel::fixed,
            (HazardKind::CapturedVariableRace, Variant::Buggy) => captured_variable::buggy,
            (HazardKind::CapturedVariableRace, Variant::Fixed) => captured_variable::fixed,
        };
        Self::new(kind, variant, run)
    }

    /// `"<hazard>/<variant>"`, e.g. `"rendezvous_block/buggy"`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.kind.name(), self.variant.name())
    }

    pub fn kind(&self) -> HazardKind {
        self.kind
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Start the body. Nothing is spawned until the returned future is first polled.
    pub fn run(&self, ctx: ScenarioContext) -> BoxFuture<'static, HarnessResult<Observation>> {
        (self.run)(ctx)
    }

    /// Check a run against this scenario's polarity.
    ///
    /// Buggy variants must show their [`ExpectedHazard`]; fixed variants must complete with
    /// the right observation and nothing left behind.
    ///
    /// # Errors
    ///
    /// A message describing the mismatch.
    pub fn check(&self, report: &RunReport) -> Result<(), String> {
        let name = self.name();
        match (self.variant, self.kind.expected_hazard()) {
            (Variant::Fixed, _) => match &report.guard {
                Outcome::Completed(observation) if !self.kind.fixed_holds(observation) => Err(
                    format!("{}: completed with unexpected {:?}", name, observation),
                ),
                Outcome::Completed(_) if !report.leaks.is_clean() => {
                    Err(format!("{}: {}", name, report.leaks))
                }
                Outcome::Completed(_) => Ok(()),
                other => Err(format!("{}: expected completion, got {:?}", name, other)),
            },
            (Variant::Buggy, ExpectedHazard::Hang) => {
                if !report.guard.is_timed_out() {
                    Err(format!(
                        "{}: expected the guard to time out, got {:?}",
                        name, report.guard
                    ))
                } else if report.leaks.is_clean() {
                    Err(format!("{}: timed out but no unit was left behind", name))
                } else {
                    Ok(())
                }
            }
            (Variant::Buggy, ExpectedHazard::WrongResult) => match &report.guard {
                Outcome::Completed(observation) if self.kind.fixed_holds(observation) => Err(
                    format!("{}: hazard not reproduced, got {:?}", name, observation),
                ),
                Outcome::Completed(_) => Ok(()),
                other => Err(format!("{}: expected completion, got {:?}", name, other)),
            },
        }
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("kind", &self.kind)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

/// Every cataloged scenario, buggy before fixed for each hazard.
pub fn catalog() -> Vec<Scenario> {
    HazardKind::ALL
        .iter()
        .flat_map(|&kind| {
            [Variant::Buggy, Variant::Fixed]
                .into_iter()
                .map(move |variant| Scenario::of(kind, variant))
        })
        .collect()
}

/// Look a scenario up by its `"<hazard>/<variant>"` name.
///
/// # Errors
///
/// [`HarnessError::UnknownScenario`] if nothing in the catalog has that name.
pub fn find(name: &str) -> HarnessResult<Scenario> {
    catalog()
        .into_iter()
        .find(|scenario| scenario.name() == name)
        .ok_or_else(|| HarnessError::UnknownScenario {
            name: name.to_string(),
        })
}
