//! Execution Strategies
//!
//! One module per paradigm. The thread-pool strategies (fixed and work-stealing
//! pools) share the submission helpers below: each submitted unit gets a
//! single-use result slot, fan-out waits on every slot in submission order, and a
//! pipeline waits on one slot before submitting the next link.

mod deferred;
mod pool;
mod runtime;
mod stream;
mod tasks;

pub(crate) use deferred::DeferredExecutor;
pub(crate) use pool::{FixedPool, StealingPool};
pub(crate) use stream::StreamStrategy;
pub(crate) use tasks::TaskStrategy;

use crate::outcome::{ExecutionError, join_ordered};
use crate::unit::{Output, UnitFailure, Workload, WorkloadUnit, invoke_caught};
use crossbeam::channel::{self, Receiver, Sender};

/// Receiving end of one unit's result
pub(crate) type Slot = Receiver<Result<Output, UnitFailure>>;

/// Single-use result slot for one unit
pub(crate) fn slot() -> (Sender<Result<Output, UnitFailure>>, Slot) {
    channel::bounded(1)
}

/// Invoke a unit and publish its result; the receiver may already be gone
pub(crate) fn invoke_into(
    workload: &dyn Workload,
    unit: WorkloadUnit,
    upstream: Option<Output>,
    tx: Sender<Result<Output, UnitFailure>>,
) {
    let result = invoke_caught(workload, &unit, upstream.as_ref());
    let _ = tx.send(result);
}

/// Submission side of a thread-pool strategy
pub(crate) trait Dispatch {
    /// Queue one unit; its result arrives on the returned slot
    fn dispatch(&self, unit: WorkloadUnit, upstream: Option<Output>) -> Result<Slot, ExecutionError>;
}

/// Submit every unit at once, then join in submission order
pub(crate) fn fan_out<D: Dispatch + ?Sized>(
    pool: &D,
    units: Vec<WorkloadUnit>,
) -> Result<Vec<Output>, ExecutionError> {
    let slots = units
        .into_iter()
        .map(|unit| pool.dispatch(unit, None).map(|slot| (unit.id, slot)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::with_capacity(slots.len());
    for (id, slot) in slots {
        results.push(slot.recv().map_err(|_| ExecutionError::Lost { id })?);
    }
    join_ordered(results)
}

/// Submit one link at a time, each gated on the previous result
pub(crate) fn chain<D: Dispatch + ?Sized>(
    pool: &D,
    units: Vec<WorkloadUnit>,
) -> Result<Output, ExecutionError> {
    let links = units.len();
    let mut upstream = None;

    for (link, unit) in units.into_iter().enumerate() {
        let slot = pool.dispatch(unit, upstream.take())?;
        match slot.recv() {
            Ok(Ok(value)) => upstream = Some(value),
            Ok(Err(failure)) => {
                return Err(ExecutionError::ChainBroken {
                    failure,
                    link,
                    links,
                });
            }
            Err(_) => return Err(ExecutionError::Lost { id: unit.id }),
        }
    }

    upstream.ok_or(ExecutionError::EmptyPipeline)
}
