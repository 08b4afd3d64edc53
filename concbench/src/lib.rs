#![warn(missing_docs)]
//! # ConcBench
//!
//! Benchmark harness that measures how four concurrency execution models behave
//! on the same simulated workloads:
//! - **Worker pools**: a fixed pool with one FIFO queue, or a work-stealing pool
//! - **Deferred values**: futures composed on a shared thread pool
//! - **Bounded streams**: an order-preserving operator with a cap on in-flight units,
//!   or disjoint rails drained in parallel
//! - **Task per unit**: lightweight tasks over a few carrier threads, optionally
//!   structured so the first failure cancels its siblings
//!
//! The fixed pool can also run every unit under a shared [`LockKind`] to measure
//! lock contention.
//!
//! Each trial owns its concurrency resource through a [`ResourceScope`], which is
//! released before the next trial starts and reports workers that outlive their
//! bounded wait.
//!
//! ## Quick Start
//!
//! ```ignore
//! use concbench::prelude::*;
//! use std::sync::Arc;
//!
//! let config = RunConfiguration::new(
//!     Strategy::Stream(StreamFlavor::Bounded),
//!     ExecutionMode::FanOut,
//!     WorkloadKind::Database,
//!     10,
//!     4,
//! )?;
//! let run = ResourceScope::scoped(
//!     config,
//!     Arc::new(ScenarioWorkload::default()),
//!     DEFAULT_TEARDOWN_TIMEOUT,
//!     |scope| scope.run_configured(),
//! )?;
//! assert_eq!(run.value?.len(), 10);
//! ```
//!
//! ## Command Line
//!
//! ```text
//! concbench init concbench.toml      # write the default configuration
//! concbench list 'stream/'           # show the planned trials
//! concbench -n 20 --format json -o report.json
//! ```

// Re-export core types
pub use concbench_core::{
    ConfigError, DEFAULT_TEARDOWN_TIMEOUT, ExecutionError, ExecutionMode, ExecutionOutcome,
    ExecutionStrategy, InvocationSpan, LockKind, Output, PoolFlavor, Recorder, READ_UNIT,
    ResourceScope, RunConfiguration, ScopeError, ScopedRun, Strategy, StreamFlavor, TaskFlavor,
    TeardownError, UnitFailure, WRITE_EVERY, WorkerGauge, Workload, WorkloadKind, WorkloadUnit,
};

// Re-export the default workloads
pub use concbench_scenarios::{ScenarioConfig, ScenarioConfigError, ScenarioWorkload};

// Re-export the driver
pub use concbench_cli::{
    Cli, ConcConfig, ExecutionPlan, Executor, TrialError, TrialResult, TrialSettings,
    build_plan, build_report, run, run_with_cli, run_trial,
};

// Re-export stats and reporting
pub use concbench_report::{OutputFormat, Report, TrialReport, TrialStatus};
pub use concbench_stats::{SummaryStatistics, compute_summary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DEFAULT_TEARDOWN_TIMEOUT, ExecutionMode, LockKind, Output, ResourceScope, RunConfiguration,
        ScenarioWorkload, Strategy, StreamFlavor, TaskFlavor, PoolFlavor, UnitFailure, Workload,
        WorkloadKind, WorkloadUnit,
    };
}
