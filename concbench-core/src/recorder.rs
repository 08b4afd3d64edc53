//! Instrumented Workload
//!
//! Wraps any [`Workload`] and records how it was driven: how many invocations
//! happened, the peak number in flight at once, and a global start/end sequence
//! number for every invocation. Pipelines can then be checked for overlap and
//! bounded strategies for their cap.

use crate::unit::{Output, UnitFailure, Workload, WorkloadUnit};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// One recorded invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationSpan {
    /// Unit id
    pub id: u64,
    /// Sequence number taken on entry
    pub start: u64,
    /// Sequence number taken on exit
    pub end: u64,
    /// Whether an upstream value was passed in
    pub chained: bool,
}

impl InvocationSpan {
    /// Whether two invocations were in flight at the same time
    pub fn overlaps(&self, other: &InvocationSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Workload wrapper that records concurrency
#[derive(Debug)]
pub struct Recorder<W> {
    inner: W,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    invocations: AtomicUsize,
    clock: AtomicU64,
    spans: Mutex<Vec<InvocationSpan>>,
}

impl<W: Workload> Recorder<W> {
    /// Wrap a workload
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            invocations: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
            spans: Mutex::new(Vec::new()),
        }
    }

    /// Highest number of concurrently running invocations observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of invocations that started
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Completed invocations, ordered by start
    pub fn spans(&self) -> Vec<InvocationSpan> {
        let mut spans = self
            .spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        spans.sort_by_key(|span| span.start);
        spans
    }

    /// Whether any two completed invocations overlapped in time
    pub fn any_overlap(&self) -> bool {
        let spans = self.spans();
        spans.windows(2).any(|pair| pair[0].overlaps(&pair[1]))
    }

    /// Clear all counters between runs
    pub fn reset(&self) {
        self.in_flight.store(0, Ordering::SeqCst);
        self.peak.store(0, Ordering::SeqCst);
        self.invocations.store(0, Ordering::SeqCst);
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<W: Workload> Workload for Recorder<W> {
    fn invoke(
        &self,
        unit: &WorkloadUnit,
        upstream: Option<&Output>,
    ) -> Result<Output, UnitFailure> {
        let start = self.clock.fetch_add(1, Ordering::SeqCst);
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = self.inner.invoke(unit, upstream);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let end = self.clock.fetch_add(1, Ordering::SeqCst);
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(InvocationSpan {
                id: unit.id,
                start,
                end,
                chained: upstream.is_some(),
            });

        result
    }
}
