//! Helpers for internal use in racetrap tests and benchmarks.
//!
//! This crate is not meant for public use and offers no stability guarantees.

#![cfg(not(tarpaulin_include))]

use std::time::Duration;

use parking_lot::Mutex;
use racetrap::{AssertionSink, HarnessConfig, ScenarioTiming};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a test-writer subscriber filtered by `RUST_LOG` (default `racetrap=debug`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("racetrap=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Timings short enough to run the whole catalog in well under a second per scenario.
pub fn quick_config() -> HarnessConfig {
    HarnessConfig::default()
        .with_deadline(Duration::from_millis(300))
        .with_settle(Duration::from_millis(20))
        .with_timing(
            ScenarioTiming::default()
                .with_work_delay(Duration::from_millis(40))
                .with_lock_delay(Duration::from_millis(5))
                .with_cancel_timeout(Duration::from_secs(1)),
        )
}

/// An [`AssertionSink`] that keeps failures instead of raising them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    failures: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

impl AssertionSink for RecordingSink {
    fn fail(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }
}
