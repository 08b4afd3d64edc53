//! Trial Execution
//!
//! One trial is one `RunConfiguration` measured inside its own resource scope:
//!
//! ```text
//! RunConfiguration
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ ResourceScope    │  setup → warm-up (discarded) → measurement → teardown
//! │   ::scoped       │
//! └────────┬─────────┘
//!          │
//!          ▼
//!  TrialResult (samples, status, failure)
//! ```
//!
//! Trials run strictly one after another: the scope of trial *k* is released
//! before trial *k+1* acquires its own.

use concbench_core::{
    DEFAULT_TEARDOWN_TIMEOUT, ExecutionError, ResourceScope, RunConfiguration, ScopeError,
    ScopedRun, TeardownError, Workload,
};
use concbench_report::TrialStatus;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Measurement loop settings shared by every trial
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSettings {
    /// Time spent invoking before measurement starts
    pub warmup_time: Duration,
    /// Time budget for the measurement phase
    pub measurement_time: Duration,
    /// Measured invocations required before the time budget may end the trial
    pub min_invocations: u64,
    /// Hard cap on measured invocations
    pub max_invocations: u64,
    /// Bounded wait for the scope's workers to exit
    pub teardown_timeout: Duration,
    /// Set when running a fixed number of invocations
    pub samples: Option<u64>,
}

impl TrialSettings {
    /// Exactly `samples` measured invocations and no warm-up
    pub fn fixed(samples: u64, teardown_timeout: Duration) -> Self {
        let samples = samples.max(1);
        Self {
            warmup_time: Duration::ZERO,
            measurement_time: Duration::ZERO,
            min_invocations: samples,
            max_invocations: samples,
            teardown_timeout,
            samples: Some(samples),
        }
    }
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            warmup_time: Duration::from_secs(3),
            measurement_time: Duration::from_secs(5),
            min_invocations: 1,
            max_invocations: u64::MAX,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
            samples: None,
        }
    }
}

/// Why a trial produced no timings, or leaked its resource
#[derive(Debug, Error)]
pub enum TrialError {
    #[error("setup failed: {0}")]
    Setup(#[from] ScopeError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("teardown failed: {0}")]
    Teardown(#[from] TeardownError),
}

impl TrialError {
    /// Short machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            TrialError::Setup(ScopeError::Config(_)) => "config",
            TrialError::Setup(_) => "setup",
            TrialError::Execution(ExecutionError::Config(_)) => "config",
            TrialError::Execution(ExecutionError::Cancelled { .. }) => "cancelled",
            TrialError::Execution(ExecutionError::ChainBroken { .. }) => "chain_broken",
            TrialError::Execution(ExecutionError::UnitsFailed { .. }) => "unit_failure",
            TrialError::Execution(_) => "execution",
            TrialError::Teardown(_) => "teardown",
        }
    }
}

/// Result from executing a single trial
#[derive(Debug)]
pub struct TrialResult {
    pub config: RunConfiguration,
    pub status: TrialStatus,
    /// Nanoseconds per measured invocation; empty when the trial failed
    pub samples: Vec<f64>,
    /// Invocations run during warm-up
    pub warmup_invocations: u64,
    pub duration_ns: u64,
    /// The failure that ended the trial
    pub failure: Option<TrialError>,
    /// Teardown problem, reported even when the trial itself failed
    pub leak: Option<TeardownError>,
}

#[derive(Debug, Default)]
struct Measured {
    samples: Vec<f64>,
    warmup_invocations: u64,
}

/// Run one trial: scoped setup, warm-up, measurement, teardown
pub fn run_trial(
    config: RunConfiguration,
    workload: Arc<dyn Workload>,
    settings: &TrialSettings,
) -> TrialResult {
    let start = Instant::now();
    debug!(trial = %config, "trial starting");

    let scoped = ResourceScope::scoped(config, workload, settings.teardown_timeout, |scope| {
        measure(scope, settings)
    });

    let mut result = TrialResult {
        config,
        status: TrialStatus::Failed,
        samples: Vec::new(),
        warmup_invocations: 0,
        duration_ns: 0,
        failure: None,
        leak: None,
    };

    match scoped {
        Err(e) => result.failure = Some(e.into()),
        Ok(ScopedRun { value, teardown }) => {
            result.leak = teardown.err();
            match value {
                Ok(measured) => {
                    result.status = if result.leak.is_some() {
                        TrialStatus::TeardownFailed
                    } else {
                        TrialStatus::Passed
                    };
                    result.samples = measured.samples;
                    result.warmup_invocations = measured.warmup_invocations;
                }
                Err(e) => result.failure = Some(e.into()),
            }
        }
    }
    result.duration_ns = start.elapsed().as_nanos() as u64;

    match (&result.failure, &result.leak) {
        (Some(failure), _) => warn!(trial = %config, "trial failed: {}", failure),
        (None, Some(leak)) => warn!(trial = %config, "trial leaked its resource: {}", leak),
        (None, None) => debug!(
            trial = %config,
            invocations = result.samples.len(),
            "trial complete"
        ),
    }
    result
}

/// Warm-up then measurement, stopping at the first failed invocation
fn measure(scope: &ResourceScope, settings: &TrialSettings) -> Result<Measured, ExecutionError> {
    let mut measured = Measured::default();

    let warmup_start = Instant::now();
    while warmup_start.elapsed() < settings.warmup_time {
        scope.run_configured()?.consume();
        measured.warmup_invocations += 1;
    }

    let min_invocations = settings.min_invocations.max(1);
    let max_invocations = settings.max_invocations.max(min_invocations);
    let measure_start = Instant::now();

    loop {
        let invocations = measured.samples.len() as u64;
        if invocations >= max_invocations {
            break;
        }
        if invocations >= min_invocations && measure_start.elapsed() >= settings.measurement_time {
            break;
        }

        let units = scope.config().units();
        let started = Instant::now();
        let outcome = scope.run(units)?;
        let elapsed = started.elapsed();
        outcome.consume();
        measured.samples.push(elapsed.as_nanos() as f64);
    }

    Ok(measured)
}

/// Execute trials one after another (in-process)
pub struct Executor {
    settings: TrialSettings,
    workload: Arc<dyn Workload>,
    show_progress: bool,
    results: Vec<TrialResult>,
}

impl Executor {
    pub fn new(settings: TrialSettings, workload: Arc<dyn Workload>) -> Self {
        Self {
            settings,
            workload,
            show_progress: true,
            results: Vec::new(),
        }
    }

    /// Hide the progress bar
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Settings every trial runs with
    pub fn settings(&self) -> &TrialSettings {
        &self.settings
    }

    /// Execute all planned trials
    pub fn execute(&mut self, trials: &[RunConfiguration]) -> Vec<TrialResult> {
        let pb = if self.show_progress {
            ProgressBar::new(trials.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        info!(trials = trials.len(), "starting run");
        for config in trials {
            pb.set_message(config.id());
            let result = run_trial(*config, Arc::clone(&self.workload), &self.settings);
            self.results.push(result);
            pb.inc(1);
        }

        pb.finish_with_message("Complete");
        info!("run complete");
        std::mem::take(&mut self.results)
    }
}
