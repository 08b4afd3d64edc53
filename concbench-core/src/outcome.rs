//! Execution Outcomes
//!
//! What a strategy hands back to the driver: every value in submission order, the
//! single final link of a pipeline, or one aggregated failure.

use crate::config::ConfigError;
use crate::unit::{Output, UnitFailure};
use thiserror::Error;

/// Fully joined result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// One value per unit, in submission order
    FanOut(Vec<Output>),
    /// The last link of the chain
    Pipeline(Output),
}

impl ExecutionOutcome {
    /// Number of values observed by the caller
    pub fn len(&self) -> usize {
        self.values().len()
    }

    /// Whether the outcome carries no values
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Values in submission (or chain) order
    pub fn values(&self) -> &[Output] {
        match self {
            ExecutionOutcome::FanOut(values) => values,
            ExecutionOutcome::Pipeline(value) => std::slice::from_ref(value),
        }
    }

    /// Read every value so the measured work cannot be optimized away
    pub fn consume(self) {
        for value in self.values() {
            std::hint::black_box(value);
        }
        drop(std::hint::black_box(self));
    }
}

/// Failure of one invocation as seen at the join boundary
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Every unit ran and at least one failed
    #[error("{failed} of {total} units failed; first: {first}")]
    UnitsFailed {
        /// Earliest failure by submission order
        first: UnitFailure,
        /// Number of failed units
        failed: usize,
        /// Units in the invocation
        total: usize,
    },

    /// A structured scope cancelled its outstanding siblings after a failure
    #[error("scope cancelled {cancelled} of {total} units after: {first}")]
    Cancelled {
        /// Earliest failure by submission order
        first: UnitFailure,
        /// Units that never ran
        cancelled: usize,
        /// Units in the invocation
        total: usize,
    },

    /// A pipeline link failed, so no later link could run
    #[error("pipeline broke at link {link} of {links}: {failure}")]
    ChainBroken {
        /// Failure of the broken link
        failure: UnitFailure,
        /// Zero-based position of the broken link
        link: usize,
        /// Links in the chain
        links: usize,
    },

    /// A pipeline was asked to run zero units
    #[error("pipeline needs at least one unit")]
    EmptyPipeline,

    /// The resource refused a unit
    #[error("failed to dispatch unit {id}: {reason}")]
    Dispatch {
        /// Unit that could not be submitted
        id: u64,
        /// Cause reported by the resource
        reason: String,
    },

    /// A unit's result slot closed without a value
    #[error("unit {id} never reported a result")]
    Lost {
        /// Unit whose result went missing
        id: u64,
    },

    /// The scope's resource was torn down before the run
    #[error("resource scope was already released")]
    Released,

    /// The strategy cannot run the requested configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExecutionError {
    /// The unit failure behind this error, if one unit caused it
    pub fn first_failure(&self) -> Option<&UnitFailure> {
        match self {
            ExecutionError::UnitsFailed { first, .. } | ExecutionError::Cancelled { first, .. } => {
                Some(first)
            }
            ExecutionError::ChainBroken { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Join per-unit results collected in submission order
///
/// Runs after every unit has settled. The earliest failing unit by submission order
/// is reported, together with how many failed in total.
pub(crate) fn join_ordered(
    results: Vec<Result<Output, UnitFailure>>,
) -> Result<Vec<Output>, ExecutionError> {
    let total = results.len();
    let mut values = Vec::with_capacity(total);
    let mut first = None;
    let mut failed = 0;

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(failure) => {
                failed += 1;
                first.get_or_insert(failure);
            }
        }
    }

    match first {
        None => Ok(values),
        Some(first) => Err(ExecutionError::UnitsFailed {
            first,
            failed,
            total,
        }),
    }
}
