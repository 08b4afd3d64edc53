//! Live Worker Accounting
//!
//! Each resource scope counts its live worker threads here. Teardown waits on the
//! count with a deadline and reports whatever is still alive as a leak.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Shared count of live worker threads for one resource scope
#[derive(Debug, Clone, Default)]
pub struct WorkerGauge {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

/// Decrements the gauge when the owning worker exits
#[derive(Debug)]
pub(crate) struct GaugeGuard {
    gauge: WorkerGauge,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.release();
    }
}

impl WorkerGauge {
    /// Create an empty gauge
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `n` workers that have not started yet
    pub fn reserve(&self, n: usize) {
        let (count, _) = &*self.inner;
        *count.lock().unwrap_or_else(PoisonError::into_inner) += n;
    }

    /// Mark one worker as exited
    pub fn release(&self) {
        let (count, exited) = &*self.inner;
        let mut live = count.lock().unwrap_or_else(PoisonError::into_inner);
        *live = live.saturating_sub(1);
        if *live == 0 {
            exited.notify_all();
        }
    }

    /// Reserve one worker and hand back a guard that releases it on drop
    ///
    /// Create the guard before spawning and move it into the thread.
    pub(crate) fn guard(&self) -> GaugeGuard {
        self.reserve(1);
        GaugeGuard {
            gauge: self.clone(),
        }
    }

    /// Current number of live workers
    pub fn live(&self) -> usize {
        let (count, _) = &*self.inner;
        *count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every worker has exited or `timeout` elapses
    ///
    /// Returns the number of workers still alive (0 on success).
    pub fn wait_idle(&self, timeout: Duration) -> usize {
        let (count, exited) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut live = count.lock().unwrap_or_else(PoisonError::into_inner);
        while *live > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            live = exited
                .wait_timeout(live, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *live
    }
}
