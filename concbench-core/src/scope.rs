//! Resource Scopes
//!
//! A [`ResourceScope`] owns the concurrency resource of exactly one trial and the
//! strategy that drives units through it. It is released on every exit path:
//! explicitly via [`ResourceScope::teardown`] (which reports leaks), or by `Drop`
//! as a backstop that logs them.
//!
//! ```text
//! setup(config, workload) ──► run(units) × (warm-up + measurement) ──► teardown()
//!          │                                                       │
//!          └──────────── ResourceScope::scoped(..) wraps both ─────┘
//! ```

use crate::config::{ConfigError, ExecutionMode, PoolFlavor, RunConfiguration, Strategy};
use crate::lock::LockedWorkload;
use crate::outcome::{ExecutionError, ExecutionOutcome};
use crate::strategy::{DeferredExecutor, FixedPool, StealingPool, StreamStrategy, TaskStrategy};
use crate::unit::{Output, Workload, WorkloadUnit};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Failure to acquire a trial's resource
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The pool or runtime could not be created
    #[error("failed to build {resource}: {source}")]
    Build {
        /// Resource being built
        resource: &'static str,
        /// Underlying builder error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The configuration was rejected before any resource existed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure to release a trial's resource within its bounded wait
#[derive(Debug, Error)]
pub enum TeardownError {
    /// Workers were still alive when the bounded wait ran out
    #[error("{resource} still had {live} live worker(s) after {timeout:?}")]
    Timeout {
        /// Resource being released
        resource: &'static str,
        /// Workers still alive
        live: usize,
        /// Wait that elapsed
        timeout: Duration,
    },

    /// A worker thread ended in a panic
    #[error("{resource} worker panicked while shutting down")]
    WorkerPanicked {
        /// Resource being released
        resource: &'static str,
    },
}

/// One concurrency paradigm, bound to its resource
///
/// Implementations block the calling thread until the whole invocation is joined;
/// no partial results are exposed.
pub trait ExecutionStrategy: Send + Sync {
    /// Selector this implementation serves
    fn strategy(&self) -> Strategy;

    /// Run every unit as concurrently as the paradigm allows and return the values
    /// in submission order
    fn fan_out_join(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError>;

    /// Run the units as one dependency chain and return the final link
    fn pipeline(&self, units: Vec<WorkloadUnit>) -> Result<Output, ExecutionError> {
        let _ = units;
        Err(ConfigError::UnsupportedMode {
            strategy: self.strategy(),
            mode: ExecutionMode::Pipeline,
        }
        .into())
    }

    /// Release the backing resource, waiting at most `timeout` for workers to exit
    fn shutdown(self: Box<Self>, timeout: Duration) -> Result<(), TeardownError>;
}

/// Per-trial owner of an execution strategy and its resource
pub struct ResourceScope {
    config: RunConfiguration,
    strategy: Option<Box<dyn ExecutionStrategy>>,
    teardown_timeout: Duration,
}

/// Result of a closure run inside [`ResourceScope::scoped`]
#[derive(Debug)]
pub struct ScopedRun<T> {
    /// Whatever the closure returned
    pub value: T,
    /// How the scope's release went
    pub teardown: Result<(), TeardownError>,
}

impl ResourceScope {
    /// Acquire the resource the configuration's strategy needs
    #[instrument(skip(workload), fields(trial = %config))]
    pub fn setup(
        config: RunConfiguration,
        workload: Arc<dyn Workload>,
        teardown_timeout: Duration,
    ) -> Result<Self, ScopeError> {
        let width = config.concurrency_limit();
        let workload: Arc<dyn Workload> = match config.lock() {
            Some(lock) => {
                debug!(%lock, "units contend for a shared lock");
                Arc::new(LockedWorkload::new(lock, workload))
            }
            None => workload,
        };
        let strategy: Box<dyn ExecutionStrategy> = match config.strategy() {
            Strategy::WorkerPool(PoolFlavor::Fixed) => Box::new(FixedPool::new(width, workload)?),
            Strategy::WorkerPool(PoolFlavor::WorkStealing) => {
                Box::new(StealingPool::new(width, workload)?)
            }
            Strategy::Deferred => Box::new(DeferredExecutor::new(width, workload)?),
            Strategy::Stream(flavor) => Box::new(StreamStrategy::new(flavor, width, workload)?),
            Strategy::Tasks(flavor) => Box::new(TaskStrategy::new(flavor, width, workload)?),
        };
        debug!(width, "resource scope ready");

        Ok(Self {
            config,
            strategy: Some(strategy),
            teardown_timeout,
        })
    }

    /// Run `f` with a freshly acquired scope and always release it afterwards
    ///
    /// If `f` panics the scope is still released by `Drop` during unwinding.
    pub fn scoped<T>(
        config: RunConfiguration,
        workload: Arc<dyn Workload>,
        teardown_timeout: Duration,
        f: impl FnOnce(&ResourceScope) -> T,
    ) -> Result<ScopedRun<T>, ScopeError> {
        let scope = Self::setup(config, workload, teardown_timeout)?;
        let value = f(&scope);
        let teardown = scope.teardown();
        Ok(ScopedRun { value, teardown })
    }

    /// Configuration this scope was built for
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Run one invocation over `units` in the configured mode
    pub fn run(&self, units: Vec<WorkloadUnit>) -> Result<ExecutionOutcome, ExecutionError> {
        let Some(strategy) = self.strategy.as_deref() else {
            return Err(ExecutionError::Released);
        };
        match self.config.mode() {
            ExecutionMode::FanOut => strategy.fan_out_join(units).map(ExecutionOutcome::FanOut),
            ExecutionMode::Pipeline => strategy.pipeline(units).map(ExecutionOutcome::Pipeline),
        }
    }

    /// Run one invocation with fresh units built from the configuration
    pub fn run_configured(&self) -> Result<ExecutionOutcome, ExecutionError> {
        self.run(self.config.units())
    }

    /// Release the resource and report whether it drained within the bounded wait
    #[instrument(skip(self), fields(trial = %self.config))]
    pub fn teardown(mut self) -> Result<(), TeardownError> {
        match self.strategy.take() {
            Some(strategy) => {
                let result = strategy.shutdown(self.teardown_timeout);
                match &result {
                    Ok(()) => debug!("resource scope released"),
                    Err(e) => error!("resource scope leaked: {}", e),
                }
                result
            }
            None => Ok(()),
        }
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        if let Some(strategy) = self.strategy.take() {
            if let Err(e) = strategy.shutdown(self.teardown_timeout) {
                error!(trial = %self.config, "resource scope leaked during drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StreamFlavor, TaskFlavor};
    use crate::unit::{UnitFailure, WorkloadKind};

    fn square(unit: &WorkloadUnit, _: Option<&Output>) -> Result<Output, UnitFailure> {
        Ok(Output::Number((unit.id * unit.id) as i64))
    }

    #[test]
    fn test_scoped_releases_every_strategy() {
        for strategy in Strategy::ALL {
            let config =
                RunConfiguration::new(strategy, ExecutionMode::FanOut, WorkloadKind::Compute, 6, 3)
                    .unwrap();
            let run = ResourceScope::scoped(
                config,
                Arc::new(square),
                Duration::from_secs(5),
                |scope| scope.run_configured(),
            )
            .unwrap();

            let outcome = run.value.unwrap();
            assert_eq!(outcome.len(), 6, "{strategy}");
            assert!(run.teardown.is_ok(), "{strategy}: {:?}", run.teardown);
        }
    }

    #[test]
    fn test_unsupported_pipeline_default() {
        let scope = ResourceScope::setup(
            RunConfiguration::new(
                Strategy::Tasks(TaskFlavor::Unstructured),
                ExecutionMode::FanOut,
                WorkloadKind::Compute,
                2,
                1,
            )
            .unwrap(),
            Arc::new(square),
            Duration::from_secs(5),
        )
        .unwrap();

        let strategy = scope.strategy.as_deref().unwrap();
        let err = strategy
            .pipeline(WorkloadUnit::batch(WorkloadKind::Compute, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Config(ConfigError::UnsupportedMode { .. })
        ));
        scope.teardown().unwrap();
    }

    #[test]
    fn test_locked_scope_serializes_units() {
        let recorder = Arc::new(crate::recorder::Recorder::new(
            |unit: &WorkloadUnit, _: Option<&Output>| -> Result<Output, UnitFailure> {
                std::thread::sleep(Duration::from_millis(5));
                Ok(Output::Number(unit.id as i64))
            },
        ));
        let config = RunConfiguration::new(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            8,
            4,
        )
        .unwrap()
        .with_lock(crate::lock::LockKind::Mutex)
        .unwrap();

        let run = ResourceScope::scoped(config, recorder.clone(), Duration::from_secs(5), |scope| {
            scope.run_configured()
        })
        .unwrap();
        assert_eq!(run.value.unwrap().len(), 8);
        run.teardown.unwrap();
        assert_eq!(recorder.invocations(), 8);
        assert_eq!(recorder.peak(), 1);
    }

    #[test]
    fn test_drop_releases_scope() {
        let config = RunConfiguration::new(
            Strategy::Stream(StreamFlavor::Rails),
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            4,
            2,
        )
        .unwrap();
        let scope = ResourceScope::setup(config, Arc::new(square), Duration::from_secs(5)).unwrap();
        scope.run_configured().unwrap();
        drop(scope);
    }
}
