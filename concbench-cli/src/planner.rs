//! Trial Planner
//!
//! Crosses the `[params]` table into one `RunConfiguration` per trial.
//!
//! - Widths follow the paradigm: pool widths for worker pools and deferred
//!   executors, stream widths for streams, carrier threads for tasks
//! - Strategy/mode pairs the strategy cannot run are skipped
//! - Each configured lock adds one locked copy of every fixed-pool fan-out trial
//! - An optional regex filters on the trial id
//!
//! Ordering: trials are sorted by workload, mode, operation count, strategy,
//! width and lock, so the same configuration always yields the same plan.

use crate::config::ParamsConfig;
use concbench_core::{
    ConfigError, ExecutionMode, LockKind, PoolFlavor, RunConfiguration, Strategy, WorkloadKind,
};
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

/// Execution plan for trials
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Ordered list of trials to run
    pub trials: Vec<RunConfiguration>,
}

impl ExecutionPlan {
    /// Number of planned trials
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// Build the execution plan from the parameter space
///
/// Every name is resolved before anything is crossed, so a typo fails the whole
/// plan instead of silently shrinking it.
pub fn build_plan(
    params: &ParamsConfig,
    filter: Option<&Regex>,
) -> Result<ExecutionPlan, ConfigError> {
    let workloads: Vec<WorkloadKind> = parse_all(&params.workloads)?;
    let strategies: Vec<Strategy> = parse_all(&params.strategies)?;
    let modes: Vec<ExecutionMode> = parse_all(&params.modes)?;
    let locks = lock_kinds(params)?;
    let carriers = carrier_threads(params);

    let mut trials = Vec::new();
    for &workload in &workloads {
        for &mode in &modes {
            for &strategy in &strategies {
                if !strategy.supports(mode) {
                    debug!(%strategy, %mode, "skipping unsupported combination");
                    continue;
                }
                let widths = match strategy {
                    Strategy::WorkerPool(_) | Strategy::Deferred => &params.pool_widths,
                    Strategy::Stream(_) => &params.stream_widths,
                    Strategy::Tasks(_) => &carriers,
                };
                for &operation_count in &params.operation_counts {
                    for &width in widths {
                        let config = RunConfiguration::new(
                            strategy,
                            mode,
                            workload,
                            operation_count,
                            width,
                        )?;
                        let mut variants = vec![config];
                        if strategy == Strategy::WorkerPool(PoolFlavor::Fixed)
                            && mode == ExecutionMode::FanOut
                        {
                            for &lock in &locks {
                                variants.push(config.with_lock(lock)?);
                            }
                        }
                        trials.extend(
                            variants
                                .into_iter()
                                .filter(|c| filter.is_none_or(|re| re.is_match(&c.id()))),
                        );
                    }
                }
            }
        }
    }

    // Sort for deterministic execution order
    trials.sort_by_key(|c| {
        (
            c.workload(),
            c.mode(),
            c.operation_count(),
            c.strategy(),
            c.concurrency_limit(),
            c.lock(),
        )
    });
    trials.dedup();

    Ok(ExecutionPlan { trials })
}

fn parse_all<T: FromStr<Err = ConfigError>>(names: &[String]) -> Result<Vec<T>, ConfigError> {
    names.iter().map(|name| name.parse()).collect()
}

fn lock_kinds(params: &ParamsConfig) -> Result<Vec<LockKind>, ConfigError> {
    let mut locks = Vec::new();
    for name in &params.locks {
        locks.extend(LockKind::expand(name, &params.permits)?);
    }
    Ok(locks)
}

fn carrier_threads(params: &ParamsConfig) -> Vec<usize> {
    if params.carrier_threads.is_empty() {
        vec![
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        ]
    } else {
        params.carrier_threads.clone()
    }
}
