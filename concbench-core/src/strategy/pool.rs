//! Bounded Worker Pools
//!
//! Reusable OS threads with a hard width. The fixed pool feeds every worker from
//! one shared FIFO queue; the work-stealing pool is a dedicated rayon pool whose
//! workers keep local deques and steal from each other.

use super::{Dispatch, Slot, chain, fan_out, invoke_into, slot};
use crate::config::{PoolFlavor, Strategy};
use crate::gauge::WorkerGauge;
use crate::outcome::ExecutionError;
use crate::scope::{ExecutionStrategy, ScopeError, TeardownError};
use crate::unit::{Output, Workload, WorkloadUnit};
use crossbeam::channel::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

const FIXED_POOL: &str = "fixed worker pool";
const STEALING_POOL: &str = "work-stealing pool";

/// `width` named threads draining one FIFO job queue
pub(crate) struct FixedPool {
    workload: Arc<dyn Workload>,
    queue: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    gauge: WorkerGauge,
}

impl FixedPool {
    pub(crate) fn new(width: usize, workload: Arc<dyn Workload>) -> Result<Self, ScopeError> {
        let (queue, jobs) = channel::unbounded::<Job>();
        let gauge = WorkerGauge::new();
        let mut workers = Vec::with_capacity(width);

        for index in 0..width {
            let jobs = jobs.clone();
            let guard = gauge.guard();
            let handle = thread::Builder::new()
                .name(format!("concbench-pool-{index}"))
                .spawn(move || {
                    let _guard = guard;
                    for job in jobs.iter() {
                        job();
                    }
                })
                .map_err(|e| ScopeError::Build {
                    resource: FIXED_POOL,
                    source: Box::new(e),
                })?;
            workers.push(handle);
        }

        debug!(width, "fixed worker pool started");
        Ok(Self {
            workload,
            queue,
            workers,
            gauge,
        })
    }
}

impl Dispatch for FixedPool {
    fn dispatch(&self, unit: WorkloadUnit, upstream: Option<Output>) -> Result<Slot, ExecutionError> {
        let (tx, rx) = slot();
        let workload = Arc::clone(&self.workload);
        self.queue
            .send(Box::new(move || invoke_into(workload.as_ref(), unit, upstream, tx)))
            .map_err(|_| ExecutionError::Dispatch {
                id: unit.id,
                reason: "worker queue closed".to_string(),
            })?;
        Ok(rx)
    }
}

impl ExecutionStrategy for FixedPool {
    fn strategy(&self) -> Strategy {
        Strategy::WorkerPool(PoolFlavor::Fixed)
    }

    fn fan_out_join(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        fan_out(self, units)
    }

    fn pipeline(&self, units: Vec<WorkloadUnit>) -> Result<Output, ExecutionError> {
        chain(self, units)
    }

    fn shutdown(self: Box<Self>, timeout: Duration) -> Result<(), TeardownError> {
        let FixedPool {
            queue,
            workers,
            gauge,
            ..
        } = *self;

        // Closing the queue lets every worker finish its backlog and exit.
        drop(queue);
        let live = gauge.wait_idle(timeout);
        if live > 0 {
            return Err(TeardownError::Timeout {
                resource: FIXED_POOL,
                live,
                timeout,
            });
        }

        for worker in workers {
            worker
                .join()
                .map_err(|_| TeardownError::WorkerPanicked {
                    resource: FIXED_POOL,
                })?;
        }
        debug!("fixed worker pool stopped");
        Ok(())
    }
}

/// Dedicated rayon pool of `width` threads
pub(crate) struct StealingPool {
    workload: Arc<dyn Workload>,
    pool: rayon::ThreadPool,
    gauge: WorkerGauge,
}

impl StealingPool {
    pub(crate) fn new(width: usize, workload: Arc<dyn Workload>) -> Result<Self, ScopeError> {
        let gauge = WorkerGauge::new();
        gauge.reserve(width);
        let exited = gauge.clone();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|index| format!("concbench-steal-{index}"))
            .exit_handler(move |_| exited.release())
            .build()
            .map_err(|e| ScopeError::Build {
                resource: STEALING_POOL,
                source: Box::new(e),
            })?;

        debug!(width, "work-stealing pool started");
        Ok(Self {
            workload,
            pool,
            gauge,
        })
    }
}

impl Dispatch for StealingPool {
    fn dispatch(&self, unit: WorkloadUnit, upstream: Option<Output>) -> Result<Slot, ExecutionError> {
        let (tx, rx) = slot();
        let workload = Arc::clone(&self.workload);
        self.pool
            .spawn(move || invoke_into(workload.as_ref(), unit, upstream, tx));
        Ok(rx)
    }
}

impl ExecutionStrategy for StealingPool {
    fn strategy(&self) -> Strategy {
        Strategy::WorkerPool(PoolFlavor::WorkStealing)
    }

    fn fan_out_join(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        fan_out(self, units)
    }

    fn pipeline(&self, units: Vec<WorkloadUnit>) -> Result<Output, ExecutionError> {
        chain(self, units)
    }

    fn shutdown(self: Box<Self>, timeout: Duration) -> Result<(), TeardownError> {
        let StealingPool { pool, gauge, .. } = *self;

        // Dropping the pool terminates its registry; workers exit once idle.
        drop(pool);
        match gauge.wait_idle(timeout) {
            0 => {
                debug!("work-stealing pool stopped");
                Ok(())
            }
            live => Err(TeardownError::Timeout {
                resource: STEALING_POOL,
                live,
                timeout,
            }),
        }
    }
}
