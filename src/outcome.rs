//! Discriminated results of running something under the harness.

use std::time::Duration;

use crate::registry::LeakReport;
use crate::sync::CancelReason;

/// What a guarded invocation produced.
///
/// Outcomes are plain values: the guard and the leak detector report them, the calling test
/// decides what they mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The task finished before the deadline.
    Completed(T),
    /// The deadline elapsed first. The task may still be running.
    TimedOut,
    /// Units outlived the scope that spawned them.
    Leaked(usize),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::TimedOut => Outcome::TimedOut,
            Outcome::Leaked(count) => Outcome::Leaked(count),
        }
    }
}

/// The value a scenario body produces when it runs to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A value handed across a rendezvous.
    Value(i32),
    /// How many contributors had finished when the barrier released.
    Completions(usize),
    /// Labels computed by spawned units, in arrival order.
    Labels(Vec<String>),
    /// The cancellation a waiter observed.
    Cancelled(CancelReason),
}

/// Everything [`Harness::run`](crate::Harness::run) learned about one scenario run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: String,
    /// What the timeout guard saw. Never `Leaked`.
    pub guard: Outcome<Observation>,
    pub leaks: LeakReport,
    /// Wall-clock time from the start of the run to the end of the settle period.
    pub elapsed: Duration,
}

impl RunReport {
    /// Collapse the report into a single outcome.
    ///
    /// A timeout wins over a leak, and a leak wins over a completed value.
    pub fn outcome(&self) -> Outcome<Observation> {
        match &self.guard {
            Outcome::TimedOut => Outcome::TimedOut,
            _ if !self.leaks.is_clean() => Outcome::Leaked(self.leaks.count()),
            other => other.clone(),
        }
    }

    pub fn leaked(&self) -> usize {
        self.leaks.count()
    }
}
