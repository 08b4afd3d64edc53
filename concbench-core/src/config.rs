//! Run Configuration
//!
//! Strategy and mode selectors, plus the validated parameter set for one measured
//! invocation. Every invalid combination is rejected here, before a scope exists
//! and before any unit is dispatched.

use crate::lock::LockKind;
use crate::unit::{WorkloadKind, WorkloadUnit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid parameters, detected at trial construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `operation_count` was zero
    #[error("operation count must be at least 1")]
    ZeroOperations,

    /// `concurrency_limit` was zero
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,

    /// The strategy cannot express the requested mode
    #[error("strategy {strategy} does not support {mode} mode")]
    UnsupportedMode {
        /// Requested strategy
        strategy: Strategy,
        /// Requested mode
        mode: ExecutionMode,
    },

    /// A lock was requested for a strategy or mode that does not take one
    #[error("lock {lock} needs pool-fixed fan-out, not {strategy} {mode}")]
    UnsupportedLock {
        /// Requested lock
        lock: LockKind,
        /// Requested strategy
        strategy: Strategy,
        /// Requested mode
        mode: ExecutionMode,
    },

    /// A semaphore was configured with no permits
    #[error("semaphore needs at least 1 permit")]
    ZeroPermits,

    /// Strategy name not recognized
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Workload kind name not recognized
    #[error("unknown workload kind: {0}")]
    UnknownWorkload(String),

    /// Mode name not recognized
    #[error("unknown execution mode: {0}")]
    UnknownMode(String),

    /// Lock name not recognized
    #[error("unknown lock: {0}")]
    UnknownLock(String),
}

/// Worker pool flavor for the bounded-pool paradigm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolFlavor {
    /// Fixed number of threads sharing one FIFO queue
    Fixed,
    /// Threads with local deques that steal from each other
    WorkStealing,
}

/// Stream flavor for the bounded-concurrency stream paradigm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamFlavor {
    /// Order-preserving mapping operator with a cap on in-flight invocations
    Bounded,
    /// Disjoint round-robin rails, each drained sequentially
    Rails,
}

/// Task flavor for the task-per-unit paradigm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskFlavor {
    /// Every task runs to completion regardless of sibling failures
    Unstructured,
    /// First failure cancels every outstanding sibling
    Structured,
}

/// Execution strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Strategy {
    /// Bounded worker pool
    WorkerPool(PoolFlavor),
    /// Composable deferred values on a shared executor
    Deferred,
    /// Bounded-concurrency asynchronous stream
    Stream(StreamFlavor),
    /// Lightweight task per unit
    Tasks(TaskFlavor),
}

impl Strategy {
    /// Every strategy, in reporting order
    pub const ALL: [Strategy; 7] = [
        Strategy::WorkerPool(PoolFlavor::Fixed),
        Strategy::WorkerPool(PoolFlavor::WorkStealing),
        Strategy::Deferred,
        Strategy::Stream(StreamFlavor::Bounded),
        Strategy::Stream(StreamFlavor::Rails),
        Strategy::Tasks(TaskFlavor::Unstructured),
        Strategy::Tasks(TaskFlavor::Structured),
    ];

    /// Canonical name used in configuration files and trial ids
    pub fn name(self) -> &'static str {
        match self {
            Strategy::WorkerPool(PoolFlavor::Fixed) => "pool-fixed",
            Strategy::WorkerPool(PoolFlavor::WorkStealing) => "pool-stealing",
            Strategy::Deferred => "deferred",
            Strategy::Stream(StreamFlavor::Bounded) => "stream",
            Strategy::Stream(StreamFlavor::Rails) => "stream-rails",
            Strategy::Tasks(TaskFlavor::Unstructured) => "tasks",
            Strategy::Tasks(TaskFlavor::Structured) => "tasks-structured",
        }
    }

    /// Whether this strategy can run the given mode
    ///
    /// Streams model independent elements and task groups model independent
    /// siblings, so neither expresses a dependency chain.
    pub fn supports(self, mode: ExecutionMode) -> bool {
        match mode {
            ExecutionMode::FanOut => true,
            ExecutionMode::Pipeline => {
                matches!(self, Strategy::WorkerPool(_) | Strategy::Deferred)
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.name().to_string()
    }
}

impl TryFrom<String> for Strategy {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Shape of one measured invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// N independent units, joined in submission order
    FanOut,
    /// N units chained, each fed the previous result
    Pipeline,
}

impl ExecutionMode {
    /// Both modes
    pub const ALL: [ExecutionMode; 2] = [ExecutionMode::FanOut, ExecutionMode::Pipeline];

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            ExecutionMode::FanOut => "fan-out",
            ExecutionMode::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fan-out" | "fanout" | "parallel" => Ok(ExecutionMode::FanOut),
            "pipeline" | "chain" => Ok(ExecutionMode::Pipeline),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Validated parameters for one measured invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRunConfiguration")]
pub struct RunConfiguration {
    strategy: Strategy,
    mode: ExecutionMode,
    workload: WorkloadKind,
    operation_count: usize,
    concurrency_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock: Option<LockKind>,
}

impl RunConfiguration {
    /// Validate and build a configuration
    pub fn new(
        strategy: Strategy,
        mode: ExecutionMode,
        workload: WorkloadKind,
        operation_count: usize,
        concurrency_limit: usize,
    ) -> Result<Self, ConfigError> {
        if operation_count == 0 {
            return Err(ConfigError::ZeroOperations);
        }
        if concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if !strategy.supports(mode) {
            return Err(ConfigError::UnsupportedMode { strategy, mode });
        }

        Ok(Self {
            strategy,
            mode,
            workload,
            operation_count,
            concurrency_limit,
            lock: None,
        })
    }

    /// Run every unit under a shared lock
    ///
    /// Only fixed-pool fan-out takes a lock.
    pub fn with_lock(mut self, lock: LockKind) -> Result<Self, ConfigError> {
        let lock = lock.validated()?;
        if self.strategy != Strategy::WorkerPool(PoolFlavor::Fixed)
            || self.mode != ExecutionMode::FanOut
        {
            return Err(ConfigError::UnsupportedLock {
                lock,
                strategy: self.strategy,
                mode: self.mode,
            });
        }
        self.lock = Some(lock);
        Ok(self)
    }

    /// Strategy under test
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Fan-out or pipeline
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Workload kind every unit runs
    pub fn workload(&self) -> WorkloadKind {
        self.workload
    }

    /// Units per invocation
    pub fn operation_count(&self) -> usize {
        self.operation_count
    }

    /// Pool width, stream concurrency, or carrier thread count depending on the strategy
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Lock every unit contends for, if any
    pub fn lock(&self) -> Option<LockKind> {
        self.lock
    }

    /// Fresh units for one invocation
    pub fn units(&self) -> Vec<WorkloadUnit> {
        WorkloadUnit::batch(self.workload, self.operation_count)
    }

    /// Stable identifier, e.g. `stream/fan-out/database/n=10/w=4`
    ///
    /// Locked trials carry a suffix, e.g. `pool-fixed/fan-out/compute/n=10/w=4/lock=mutex`.
    pub fn id(&self) -> String {
        let id = format!(
            "{}/{}/{}/n={}/w={}",
            self.strategy, self.mode, self.workload, self.operation_count, self.concurrency_limit
        );
        match self.lock {
            Some(lock) => format!("{id}/lock={lock}"),
            None => id,
        }
    }
}

impl fmt::Display for RunConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

#[derive(Deserialize)]
struct RawRunConfiguration {
    strategy: Strategy,
    mode: ExecutionMode,
    workload: WorkloadKind,
    operation_count: usize,
    concurrency_limit: usize,
    #[serde(default)]
    lock: Option<LockKind>,
}

impl TryFrom<RawRunConfiguration> for RunConfiguration {
    type Error = ConfigError;

    fn try_from(raw: RawRunConfiguration) -> Result<Self, Self::Error> {
        let config = RunConfiguration::new(
            raw.strategy,
            raw.mode,
            raw.workload,
            raw.operation_count,
            raw.concurrency_limit,
        )?;
        match raw.lock {
            Some(lock) => config.with_lock(lock),
            None => Ok(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_unknown_strategy() {
        assert_eq!(
            "actors".parse::<Strategy>().unwrap_err(),
            ConfigError::UnknownStrategy("actors".to_string())
        );
    }

    #[test]
    fn test_pipeline_support() {
        assert!(Strategy::WorkerPool(PoolFlavor::Fixed).supports(ExecutionMode::Pipeline));
        assert!(Strategy::WorkerPool(PoolFlavor::WorkStealing).supports(ExecutionMode::Pipeline));
        assert!(Strategy::Deferred.supports(ExecutionMode::Pipeline));
        assert!(!Strategy::Stream(StreamFlavor::Bounded).supports(ExecutionMode::Pipeline));
        assert!(!Strategy::Stream(StreamFlavor::Rails).supports(ExecutionMode::Pipeline));
        assert!(!Strategy::Tasks(TaskFlavor::Structured).supports(ExecutionMode::Pipeline));
        assert!(Strategy::ALL.iter().all(|s| s.supports(ExecutionMode::FanOut)));
    }

    #[test]
    fn test_rejects_zero_counts() {
        let err = RunConfiguration::new(
            Strategy::Deferred,
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            0,
            4,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroOperations);

        let err = RunConfiguration::new(
            Strategy::Deferred,
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            10,
            0,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroConcurrency);
    }

    #[test]
    fn test_rejects_stream_pipeline() {
        let err = RunConfiguration::new(
            Strategy::Stream(StreamFlavor::Bounded),
            ExecutionMode::Pipeline,
            WorkloadKind::Database,
            10,
            4,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedMode { .. }));
    }

    #[test]
    fn test_id_format() {
        let config = RunConfiguration::new(
            Strategy::Stream(StreamFlavor::Bounded),
            ExecutionMode::FanOut,
            WorkloadKind::Database,
            10,
            4,
        )
        .unwrap();
        assert_eq!(config.id(), "stream/fan-out/database/n=10/w=4");
        assert_eq!(config.units().len(), 10);
    }

    #[test]
    fn test_lock_needs_fixed_pool_fan_out() {
        let fixed = RunConfiguration::new(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            10,
            4,
        )
        .unwrap();
        let locked = fixed.with_lock(LockKind::Semaphore(2)).unwrap();
        assert_eq!(locked.lock(), Some(LockKind::Semaphore(2)));
        assert_eq!(locked.id(), "pool-fixed/fan-out/compute/n=10/w=4/lock=semaphore-2");
        assert_ne!(locked, fixed);

        assert_eq!(
            fixed.with_lock(LockKind::Semaphore(0)).unwrap_err(),
            ConfigError::ZeroPermits
        );

        let deferred = RunConfiguration::new(
            Strategy::Deferred,
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            10,
            4,
        )
        .unwrap();
        assert!(matches!(
            deferred.with_lock(LockKind::Mutex),
            Err(ConfigError::UnsupportedLock { .. })
        ));

        let pipeline = RunConfiguration::new(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::Pipeline,
            WorkloadKind::Compute,
            10,
            4,
        )
        .unwrap();
        assert!(pipeline.with_lock(LockKind::Atomic).is_err());
    }

    #[test]
    fn test_serde_carries_lock() {
        let json = r#"{"strategy":"pool-fixed","mode":"fan-out","workload":"network","operation_count":10,"concurrency_limit":4,"lock":"rwlock"}"#;
        let config: RunConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.lock(), Some(LockKind::RwLock));
        assert!(serde_json::to_string(&config).unwrap().contains(r#""lock":"rwlock""#));

        let json = r#"{"strategy":"stream","mode":"fan-out","workload":"network","operation_count":10,"concurrency_limit":4,"lock":"mutex"}"#;
        assert!(serde_json::from_str::<RunConfiguration>(json).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"{"strategy":"tasks","mode":"pipeline","workload":"compute","operation_count":10,"concurrency_limit":2}"#;
        assert!(serde_json::from_str::<RunConfiguration>(json).is_err());

        let json = r#"{"strategy":"deferred","mode":"pipeline","workload":"file-io","operation_count":10,"concurrency_limit":2}"#;
        let config: RunConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.strategy(), Strategy::Deferred);
        assert_eq!(config.workload(), WorkloadKind::FileIo);

        let round_trip: RunConfiguration =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }
}
