#![warn(missing_docs)]
//! ConcBench Core - Execution Models
//!
//! This crate provides the execution-model abstraction shared by every trial:
//! - `WorkloadUnit` / `Workload`: the opaque unit of work and its invocation contract
//! - `RunConfiguration`: validated parameters for one measured invocation
//! - `ExecutionStrategy`: fan-out-join and pipeline over four concurrency paradigms
//! - `ResourceScope`: per-trial ownership of the pool, runtime or task group
//! - `Recorder`: an instrumented workload for checking concurrency bounds
//! - `LockKind`: a shared lock the fixed pool's units contend for
//!
//! ## Paradigms
//!
//! | strategy | resource | fan-out | pipeline |
//! |---|---|---|---|
//! | `pool-fixed` | OS threads, one FIFO queue | yes | yes |
//! | `pool-stealing` | rayon work-stealing pool | yes | yes |
//! | `deferred` | futures thread pool | yes | yes |
//! | `stream` | tokio, bounded `buffered` operator | yes | no |
//! | `stream-rails` | tokio, round-robin rails | yes | no |
//! | `tasks` | tokio task per unit | yes | no |
//! | `tasks-structured` | `JoinSet` + `CancellationToken` | yes | no |

mod config;
mod gauge;
mod lock;
mod outcome;
mod recorder;
mod scope;
mod strategy;
mod unit;

pub use config::{
    ConfigError, ExecutionMode, PoolFlavor, RunConfiguration, Strategy, StreamFlavor, TaskFlavor,
};
pub use gauge::WorkerGauge;
pub use lock::{LockKind, READ_UNIT, WRITE_EVERY};
pub use outcome::{ExecutionError, ExecutionOutcome};
pub use recorder::{InvocationSpan, Recorder};
pub use scope::{ExecutionStrategy, ResourceScope, ScopeError, ScopedRun, TeardownError};
pub use unit::{Output, UnitFailure, Workload, WorkloadKind, WorkloadUnit};

/// Default bounded wait for a scope to release its workers
pub const DEFAULT_TEARDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
