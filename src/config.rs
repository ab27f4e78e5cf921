//! Harness configuration.
//!
//! All wall-clock knobs live here: the guard's deadline, the leak detector's settle period, and
//! the artificial delays the scenarios use. Defaults suit a developer machine; CI can stretch
//! them through environment variables (see [`HarnessConfig::from_env`]).

use std::env;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Delays used inside the scenarios themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioTiming {
    /// How long a producer "works" before handing over its value.
    pub work_delay: Duration,
    /// How long a consumer waits for that value before giving up. Shorter than `work_delay`.
    pub bounded_wait: Duration,
    /// Head start both units take in the lock + channel scenario.
    pub lock_delay: Duration,
    /// Timeout of the token derived in the cancellation scenario.
    pub cancel_timeout: Duration,
}

impl Default for ScenarioTiming {
    fn default() -> Self {
        Self {
            work_delay: Duration::from_millis(200),
            bounded_wait: Duration::from_millis(100),
            lock_delay: Duration::from_millis(10),
            cancel_timeout: Duration::from_millis(1500),
        }
    }
}

impl ScenarioTiming {
    /// Set the work delay; the bounded wait follows at half of it.
    pub fn with_work_delay(mut self, work_delay: Duration) -> Self {
        self.work_delay = work_delay;
        self.bounded_wait = work_delay / 2;
        self
    }

    pub fn with_lock_delay(mut self, lock_delay: Duration) -> Self {
        self.lock_delay = lock_delay;
        self
    }

    pub fn with_cancel_timeout(mut self, cancel_timeout: Duration) -> Self {
        self.cancel_timeout = cancel_timeout;
        self
    }
}

/// Configuration for [`Harness`](crate::Harness).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use racetrap::HarnessConfig;
///
/// let config = HarnessConfig::default()
///     .with_deadline(Duration::from_millis(400))
///     .with_settle(Duration::from_millis(20));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// How long the timeout guard gives a scenario.
    pub deadline: Duration,
    /// How long the leak detector waits before its second snapshot.
    pub settle: Duration,
    pub timing: ScenarioTiming,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(1),
            settle: Duration::from_millis(50),
            timing: ScenarioTiming::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults, overridden by `RACETRAP_DEADLINE_MS`, `RACETRAP_SETTLE_MS` and
    /// `RACETRAP_WORK_DELAY_MS` where set. Values that do not parse are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_millis("RACETRAP_DEADLINE_MS") {
            config.deadline = ms;
        }
        if let Some(ms) = env_millis("RACETRAP_SETTLE_MS") {
            config.settle = ms;
        }
        if let Some(ms) = env_millis("RACETRAP_WORK_DELAY_MS") {
            config.timing = config.timing.with_work_delay(ms);
        }
        config
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_timing(mut self, timing: ScenarioTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Check that the fixed variants can finish inside the deadline.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidConfig`] if the deadline does not exceed the work delay, or the
    /// bounded wait is not shorter than the work delay.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.deadline <= self.timing.work_delay {
            return Err(HarnessError::InvalidConfig {
                reason: format!(
                    "deadline {:?} must exceed the work delay {:?}",
                    self.deadline, self.timing.work_delay
                ),
            });
        }
        if self.timing.bounded_wait >= self.timing.work_delay {
            return Err(HarnessError::InvalidConfig {
                reason: format!(
                    "bounded wait {:?} must be shorter than the work delay {:?}",
                    self.timing.bounded_wait, self.timing.work_delay
                ),
            });
        }
        Ok(())
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .map(Duration::from_millis)
}
