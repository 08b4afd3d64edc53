//! Per-Trial Tokio Runtime
//!
//! The stream and task strategies each own one multi-threaded runtime for the
//! life of their scope. Worker and blocking threads are counted as they start
//! and stop, and shutdown waits on that count with the scope's teardown timeout.

use crate::gauge::WorkerGauge;
use crate::scope::{ScopeError, TeardownError};
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, instrument, warn};

/// Grace period for threads that are already exiting when the shutdown deadline hits
const EXIT_GRACE: Duration = Duration::from_millis(100);

/// Options for a per-trial Tokio runtime
#[derive(Debug, Clone)]
pub(crate) struct ScopedRuntimeOptions {
    pub resource: &'static str,
    pub thread_name: &'static str,
    pub worker_threads: usize,
    pub max_blocking_threads: Option<usize>,
}

/// Tokio runtime owned by exactly one resource scope
///
/// Every runtime thread (workers and the blocking pool) is counted on start and
/// stop so shutdown can tell whether the runtime actually drained.
#[derive(Debug)]
pub(crate) struct ScopedRuntime {
    runtime: Runtime,
    gauge: WorkerGauge,
    resource: &'static str,
}

impl ScopedRuntime {
    #[instrument(skip(options), fields(resource = options.resource, workers = options.worker_threads))]
    pub(crate) fn create(options: ScopedRuntimeOptions) -> Result<Self, ScopeError> {
        let gauge = WorkerGauge::new();
        let started = gauge.clone();
        let stopped = gauge.clone();

        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(options.worker_threads.max(1))
            .thread_name(options.thread_name)
            .enable_time()
            .on_thread_start(move || started.reserve(1))
            .on_thread_stop(move || stopped.release());
        if let Some(limit) = options.max_blocking_threads {
            builder.max_blocking_threads(limit.max(1));
        }

        let runtime = builder.build().map_err(|e| ScopeError::Build {
            resource: options.resource,
            source: Box::new(e),
        })?;

        debug!("runtime created");
        Ok(Self {
            runtime,
            gauge,
            resource: options.resource,
        })
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Shut the runtime down and wait for its threads, bounded by `timeout`
    pub(crate) fn shutdown(self, timeout: Duration) -> Result<(), TeardownError> {
        let ScopedRuntime {
            runtime,
            gauge,
            resource,
        } = self;

        let deadline = Instant::now() + timeout;
        runtime.shutdown_timeout(timeout);
        let remaining = deadline.saturating_duration_since(Instant::now());

        match gauge.wait_idle(remaining.max(EXIT_GRACE)) {
            0 => {
                debug!(resource, "runtime shut down");
                Ok(())
            }
            live => {
                warn!(resource, live, "runtime threads outlived shutdown");
                Err(TeardownError::Timeout {
                    resource,
                    live,
                    timeout,
                })
            }
        }
    }
}
