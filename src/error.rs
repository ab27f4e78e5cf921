//! Error types for harness primitives.
//!
//! Expected hazards (a timed-out scenario, a leaked unit) are *outcomes*, not errors, and
//! never show up here. This module only covers handoff failures, lost units, and genuine
//! misuse of a primitive.

/// Misuse of a primitive that indicates a bug in how a scenario was built.
///
/// These are fatal: the panicking entry points (such as
/// [`CountingBarrier::done`](crate::CountingBarrier::done)) abort with this error's message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
    /// A barrier count was driven below zero.
    BarrierUnderflow { count: usize, delta: isize },
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageError::BarrierUnderflow { count, delta } => {
                write!(
                    f,
                    "Barrier underflow: applying {} to an outstanding count of {}\n\
                     \n\
                     More completions were reported than contributors were added.",
                    delta, count
                )
            }
        }
    }
}

impl std::error::Error for UsageError {}

/// Returned by [`Rendezvous::send`](crate::Rendezvous::send) when the handoff was closed
/// before a receiver took the value. The value is handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "send on a closed rendezvous")
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

/// Returned by [`Rendezvous::try_send`](crate::Rendezvous::try_send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// No buffer slot and no waiting receiver.
    Full(T),
    /// The handoff has been closed.
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Recover the value that could not be sent.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }
}

impl<T> std::fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrySendError::Full(_) => write!(f, "no receiver or buffer slot is available"),
            TrySendError::Closed(_) => write!(f, "send on a closed rendezvous"),
        }
    }
}

impl<T: std::fmt::Debug> std::error::Error for TrySendError<T> {}

/// A registered unit finished without producing a value (it panicked, or its future was
/// dropped by the runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLost {
    pub name: String,
}

impl std::fmt::Display for UnitLost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit `{}` ended without producing a value", self.name)
    }
}

impl std::error::Error for UnitLost {}

/// Errors surfaced by the harness itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HarnessError {
    /// A primitive was misused.
    Usage(UsageError),
    /// A joined unit never produced its value.
    UnitLost(UnitLost),
    /// No cataloged scenario has this name.
    UnknownScenario { name: String },
    /// The configuration cannot give the fixed variants time to finish.
    InvalidConfig { reason: String },
    /// A scenario finished without receiving the value it was waiting for.
    NothingReceived { what: &'static str },
}

impl std::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::Usage(err) => write!(f, "{}", err),
            HarnessError::UnitLost(err) => write!(f, "{}", err),
            HarnessError::UnknownScenario { name } => {
                write!(f, "no scenario named `{}` in the catalog", name)
            }
            HarnessError::InvalidConfig { reason } => {
                write!(f, "invalid harness configuration: {}", reason)
            }
            HarnessError::NothingReceived { what } => {
                write!(f, "{} finished without handing anything over", what)
            }
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Usage(err) => Some(err),
            HarnessError::UnitLost(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UsageError> for HarnessError {
    fn from(err: UsageError) -> Self {
        HarnessError::Usage(err)
    }
}

impl From<UnitLost> for HarnessError {
    fn from(err: UnitLost) -> Self {
        HarnessError::UnitLost(err)
    }
}

/// Result type for harness operations
#[cfg(not(tarpaulin_include))]
pub type HarnessResult<T> = Result<T, HarnessError>;
