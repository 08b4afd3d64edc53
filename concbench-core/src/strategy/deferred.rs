//! Composable Deferred Values
//!
//! Every unit becomes a future spawned on one shared `futures` thread pool of
//! width `concurrency_limit`. Fan-out joins the remote handles with an all-of
//! combinator. A pipeline is itself a future on the same pool: each step awaits
//! the previous value and only then spawns the next unit.

use crate::config::Strategy;
use crate::gauge::WorkerGauge;
use crate::outcome::{ExecutionError, join_ordered};
use crate::scope::{ExecutionStrategy, ScopeError, TeardownError};
use crate::unit::{Output, UnitFailure, Workload, WorkloadUnit, invoke_caught};
use futures::executor::{ThreadPool, block_on};
use futures::future::{RemoteHandle, join_all};
use futures::task::SpawnExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const RESOURCE: &str = "deferred executor";

pub(crate) struct DeferredExecutor {
    workload: Arc<dyn Workload>,
    pool: ThreadPool,
    gauge: WorkerGauge,
}

impl DeferredExecutor {
    pub(crate) fn new(width: usize, workload: Arc<dyn Workload>) -> Result<Self, ScopeError> {
        let gauge = WorkerGauge::new();
        gauge.reserve(width);
        let stopped = gauge.clone();

        let pool = ThreadPool::builder()
            .pool_size(width)
            .name_prefix("concbench-deferred-")
            .before_stop(move |_| stopped.release())
            .create()
            .map_err(|e| ScopeError::Build {
                resource: RESOURCE,
                source: Box::new(e),
            })?;

        debug!(width, "deferred executor started");
        Ok(Self {
            workload,
            pool,
            gauge,
        })
    }
}

/// Spawn one unit on the pool and hand back its eventual value
fn defer(
    pool: &ThreadPool,
    workload: Arc<dyn Workload>,
    unit: WorkloadUnit,
    upstream: Option<Output>,
) -> Result<RemoteHandle<Result<Output, UnitFailure>>, ExecutionError> {
    pool.spawn_with_handle(async move {
        invoke_caught(workload.as_ref(), &unit, upstream.as_ref())
    })
    .map_err(|e| ExecutionError::Dispatch {
        id: unit.id,
        reason: e.to_string(),
    })
}

/// Await each link before spawning the next one with its value
async fn run_chain(
    pool: ThreadPool,
    workload: Arc<dyn Workload>,
    units: Vec<WorkloadUnit>,
) -> Result<Output, ExecutionError> {
    let links = units.len();
    let mut upstream = None;

    for (link, unit) in units.into_iter().enumerate() {
        let step = defer(&pool, Arc::clone(&workload), unit, upstream.take())?;
        match step.await {
            Ok(value) => upstream = Some(value),
            Err(failure) => {
                return Err(ExecutionError::ChainBroken {
                    failure,
                    link,
                    links,
                });
            }
        }
    }

    upstream.ok_or(ExecutionError::EmptyPipeline)
}

impl ExecutionStrategy for DeferredExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::Deferred
    }

    fn fan_out_join(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        let pending = units
            .into_iter()
            .map(|unit| defer(&self.pool, Arc::clone(&self.workload), unit, None))
            .collect::<Result<Vec<_>, _>>()?;
        join_ordered(block_on(join_all(pending)))
    }

    fn pipeline(&self, units: Vec<WorkloadUnit>) -> Result<Output, ExecutionError> {
        let Some(head) = units.first().map(|unit| unit.id) else {
            return Err(ExecutionError::EmptyPipeline);
        };
        let chain = run_chain(self.pool.clone(), Arc::clone(&self.workload), units);
        let tail = self
            .pool
            .spawn_with_handle(chain)
            .map_err(|e| ExecutionError::Dispatch {
                id: head,
                reason: e.to_string(),
            })?;
        block_on(tail)
    }

    fn shutdown(self: Box<Self>, timeout: Duration) -> Result<(), TeardownError> {
        let DeferredExecutor { pool, gauge, .. } = *self;

        // The last pool handle going away stops every worker.
        drop(pool);
        match gauge.wait_idle(timeout) {
            0 => {
                debug!("deferred executor stopped");
                Ok(())
            }
            live => Err(TeardownError::Timeout {
                resource: RESOURCE,
                live,
                timeout,
            }),
        }
    }
}
