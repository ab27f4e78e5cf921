//! Runs cataloged scenarios under the timeout guard and the leak detector.
//!
//! Each run gets a fresh [`TaskRegistry`], so runs can proceed concurrently without counting
//! each other's units. The composition is always the same:
//!
//! ```text
//! detect_leaks(settle,
//!     run_with_timeout(deadline,
//!         scenario body))
//! ```
//!
//! The guard's own unit is spawned outside the registry; only what the scenario spawns through
//! its context is accounted for.

use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::guard::run_with_timeout;
use crate::outcome::{Outcome, RunReport};
use crate::registry::{detect_leaks, TaskRegistry};
use crate::scenario::{self, Scenario, ScenarioContext};
use crate::sink::AssertionSink;
use crate::spawn::Spawner;

/// Drives scenarios.
///
/// # Examples
///
/// ```
/// use racetrap::{Harness, HarnessConfig, HazardKind, Observation, Outcome, Scenario, Variant};
///
/// # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
/// let harness = Harness::new(HarnessConfig::default());
///
/// let fixed = Scenario::of(HazardKind::RendezvousBlock, Variant::Fixed);
/// let report = harness.run(&fixed).await.unwrap();
/// assert_eq!(report.outcome(), Outcome::Completed(Observation::Value(42)));
///
/// let buggy = Scenario::of(HazardKind::RendezvousBlock, Variant::Buggy);
/// let report = harness.run(&buggy).await.unwrap();
/// assert_eq!(report.guard, Outcome::TimedOut);
/// assert_eq!(report.leaks.names(), vec!["producer"]);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    spawner: Spawner,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl Harness {
    /// A harness that spawns onto the ambient tokio runtime.
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_spawner(config, Spawner::tokio())
    }

    pub fn with_spawner(config: HarnessConfig, spawner: Spawner) -> Self {
        Self { config, spawner }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one scenario to a [`RunReport`].
    ///
    /// Timing out and leaking are reported, not raised.
    ///
    /// # Errors
    ///
    /// [`HarnessError::InvalidConfig`](crate::HarnessError::InvalidConfig) before anything is
    /// spawned if the configuration fails [`HarnessConfig::validate`]; otherwise only if the
    /// scenario body itself fails, e.g. a unit it joins panicked.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), fields(scenario = %scenario.name())))]
    pub async fn run(&self, scenario: &Scenario) -> HarnessResult<RunReport> {
        self.config.validate()?;

        #[cfg(feature = "tracing")]
        info!("starting scenario");

        let registry = TaskRegistry::new(self.spawner.clone());
        let ctx = ScenarioContext::new(registry.clone(), self.config.timing.clone());
        let body = scenario.run(ctx);

        let started = Instant::now();
        let (guarded, leaks) = detect_leaks(
            &registry,
            self.config.settle,
            run_with_timeout(&self.spawner, self.config.deadline, body),
        )
        .await;
        let elapsed = started.elapsed();

        let guard = match guarded {
            Outcome::Completed(result) => Outcome::Completed(result?),
            Outcome::TimedOut => Outcome::TimedOut,
            Outcome::Leaked(count) => Outcome::Leaked(count),
        };

        #[cfg(feature = "tracing")]
        if guard.is_timed_out() || !leaks.is_clean() {
            warn!(?guard, leaked = leaks.count(), "hazard observed");
        } else {
            info!(?guard, ?elapsed, "scenario completed cleanly");
        }

        Ok(RunReport {
            scenario: scenario.name(),
            guard,
            leaks,
            elapsed,
        })
    }

    /// Look a scenario up by name and run it.
    ///
    /// # Errors
    ///
    /// [`HarnessError::UnknownScenario`](crate::HarnessError::UnknownScenario) for names not in
    /// the catalog, otherwise as [`Harness::run`].
    pub async fn run_named(&self, name: &str) -> HarnessResult<RunReport> {
        let scenario = scenario::find(name)?;
        self.run(&scenario).await
    }

    /// Run `scenario` and report through `sink` whether it showed the polarity it is
    /// cataloged with.
    ///
    /// # Errors
    ///
    /// As [`Harness::run`].
    pub async fn verify<S>(&self, scenario: &Scenario, sink: &S) -> HarnessResult<RunReport>
    where
        S: AssertionSink + ?Sized,
    {
        let report = self.run(scenario).await?;
        if let Err(message) = scenario.check(&report) {
            sink.fail(&message);
        }
        Ok(report)
    }

    /// Run the whole catalog concurrently, one registry per scenario.
    ///
    /// # Errors
    ///
    /// The first scenario body that failed.
    pub async fn run_catalog(&self) -> HarnessResult<Vec<RunReport>> {
        let catalog = scenario::catalog();
        let runs = catalog.iter().map(|scenario| self.run(scenario));
        futures::future::join_all(runs).await.into_iter().collect()
    }
}
