//! Workload Units
//!
//! The data contract between the harness and the workload collaborator.
//! Strategies know nothing about a unit beyond its id and kind: they hand it to
//! [`Workload::invoke`] and get back a value or a failure.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Simulated workload profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadKind {
    /// Query building, JSON rendering and validation
    Database,
    /// Remote call with deterministic retry and backoff
    Network,
    /// Hash and square-root accumulation
    Compute,
    /// Lazy map/filter pipeline over a large range
    MemoryTransform,
    /// In-memory pseudo-file generation and line grouping
    FileIo,
}

impl WorkloadKind {
    /// Every workload kind, in reporting order
    pub const ALL: [WorkloadKind; 5] = [
        WorkloadKind::Database,
        WorkloadKind::Network,
        WorkloadKind::Compute,
        WorkloadKind::MemoryTransform,
        WorkloadKind::FileIo,
    ];

    /// Canonical name used in configuration files and trial ids
    pub fn name(self) -> &'static str {
        match self {
            WorkloadKind::Database => "database",
            WorkloadKind::Network => "network",
            WorkloadKind::Compute => "compute",
            WorkloadKind::MemoryTransform => "memory-transform",
            WorkloadKind::FileIo => "file-io",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkloadKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "database" | "db" => Ok(WorkloadKind::Database),
            "network" | "net" => Ok(WorkloadKind::Network),
            "compute" | "cpu" => Ok(WorkloadKind::Compute),
            "memory-transform" | "memory" => Ok(WorkloadKind::MemoryTransform),
            "file-io" | "file" => Ok(WorkloadKind::FileIo),
            other => Err(ConfigError::UnknownWorkload(other.to_string())),
        }
    }
}

/// One unit of simulated work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkloadUnit {
    /// Position in the submission sequence
    pub id: u64,
    /// Workload profile to run
    pub kind: WorkloadKind,
}

impl WorkloadUnit {
    /// Create a unit
    pub fn new(id: u64, kind: WorkloadKind) -> Self {
        Self { id, kind }
    }

    /// Units `0..count` of a single kind, in submission order
    pub fn batch(kind: WorkloadKind, count: usize) -> Vec<WorkloadUnit> {
        (0..count as u64).map(|id| WorkloadUnit::new(id, kind)).collect()
    }
}

/// Value produced by a workload invocation
///
/// The harness only reads values to keep the work observable; it never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Output {
    /// A keyed record (e.g. a query result)
    Record {
        /// Id of the unit that produced it
        id: u64,
        /// Record payload
        value: String,
    },
    /// Free-form text
    Text(String),
    /// A single accumulated number
    Number(i64),
    /// A transformed sequence
    Numbers(Vec<i64>),
    /// Counts grouped by key
    Tally(BTreeMap<String, usize>),
    /// A value computed with the previous pipeline link as input
    Linked {
        /// Digest of the upstream value
        upstream: u64,
        /// This link's own value
        value: Box<Output>,
    },
}

impl Output {
    /// Stable digest of the value, used to thread pipeline links together
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Attach the upstream link this value was computed from
    pub fn linked(self, upstream: &Output) -> Output {
        Output::Linked {
            upstream: upstream.digest(),
            value: Box::new(self),
        }
    }
}

/// A single unit invocation that did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unit {id} ({kind}) failed: {message}")]
pub struct UnitFailure {
    /// Id of the failed unit
    pub id: u64,
    /// Workload kind of the failed unit
    pub kind: WorkloadKind,
    /// Cause reported by the workload
    pub message: String,
}

impl UnitFailure {
    /// Failure for `unit` with the given cause
    pub fn new(unit: &WorkloadUnit, message: impl Into<String>) -> Self {
        Self {
            id: unit.id,
            kind: unit.kind,
            message: message.into(),
        }
    }
}

/// The workload collaborator contract
///
/// Synchronous from the caller's point of view, with unspecified latency. `upstream`
/// is the previous link's value when the unit runs inside a pipeline, `None` otherwise.
/// Implementations carry no shared mutable state between invocations.
pub trait Workload: Send + Sync + 'static {
    /// Run one unit
    fn invoke(&self, unit: &WorkloadUnit, upstream: Option<&Output>)
    -> Result<Output, UnitFailure>;
}

impl<F> Workload for F
where
    F: Fn(&WorkloadUnit, Option<&Output>) -> Result<Output, UnitFailure> + Send + Sync + 'static,
{
    fn invoke(
        &self,
        unit: &WorkloadUnit,
        upstream: Option<&Output>,
    ) -> Result<Output, UnitFailure> {
        self(unit, upstream)
    }
}

/// Invoke a unit, turning a panic inside the workload into a unit failure
pub(crate) fn invoke_caught(
    workload: &dyn Workload,
    unit: &WorkloadUnit,
    upstream: Option<&Output>,
) -> Result<Output, UnitFailure> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        workload.invoke(unit, upstream)
    }))
    .unwrap_or_else(|panic| {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Err(UnitFailure::new(unit, format!("panicked: {message}")))
    })
}
