//! Bounded-Concurrency Streams
//!
//! Units flow through a stream on a dedicated Tokio runtime. The bounded flavor
//! maps each unit onto its own blocking context and keeps at most
//! `concurrency_limit` of them in flight with an order-preserving buffer. The
//! rails flavor splits the units round-robin into `concurrency_limit` rails that
//! run concurrently, each draining its share sequentially.

use super::runtime::{ScopedRuntime, ScopedRuntimeOptions};
use crate::config::{StreamFlavor, Strategy};
use crate::outcome::{ExecutionError, join_ordered};
use crate::scope::{ExecutionStrategy, ScopeError, TeardownError};
use crate::unit::{Output, UnitFailure, Workload, WorkloadUnit, invoke_caught};
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct StreamStrategy {
    flavor: StreamFlavor,
    width: usize,
    workload: Arc<dyn Workload>,
    runtime: ScopedRuntime,
}

impl StreamStrategy {
    pub(crate) fn new(
        flavor: StreamFlavor,
        width: usize,
        workload: Arc<dyn Workload>,
    ) -> Result<Self, ScopeError> {
        let runtime = ScopedRuntime::create(ScopedRuntimeOptions {
            resource: match flavor {
                StreamFlavor::Bounded => "stream runtime",
                StreamFlavor::Rails => "rails runtime",
            },
            thread_name: "concbench-stream",
            worker_threads: 1,
            max_blocking_threads: Some(width),
        })?;

        Ok(Self {
            flavor,
            width,
            workload,
            runtime,
        })
    }

    fn bounded(&self, units: Vec<WorkloadUnit>) -> Vec<Result<Output, UnitFailure>> {
        let runtime = self.runtime.runtime();
        let invocations = stream::iter(units).map(|unit| {
            let workload = Arc::clone(&self.workload);
            let task = runtime.spawn_blocking(move || invoke_caught(workload.as_ref(), &unit, None));
            async move {
                task.await.unwrap_or_else(|e| {
                    Err(UnitFailure::new(&unit, format!("blocking context failed: {e}")))
                })
            }
        });

        runtime.block_on(invocations.buffered(self.width).collect())
    }

    fn rails(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Result<Output, UnitFailure>>, ExecutionError> {
        let total = units.len();
        let rail_count = self.width.min(total);
        let mut rails: Vec<Vec<(usize, WorkloadUnit)>> = vec![Vec::new(); rail_count];
        for (index, unit) in units.into_iter().enumerate() {
            rails[index % rail_count].push((index, unit));
        }

        let runtime = self.runtime.runtime();
        let ids: Vec<u64> = rails
            .iter()
            .map(|rail| rail.first().map_or(0, |(_, unit)| unit.id))
            .collect();
        let tasks = rails.into_iter().map(|rail| {
            let workload = Arc::clone(&self.workload);
            runtime.spawn_blocking(move || {
                rail.into_iter()
                    .map(|(index, unit)| (index, invoke_caught(workload.as_ref(), &unit, None)))
                    .collect::<Vec<_>>()
            })
        });
        let joined = runtime.block_on(join_all(tasks));

        let mut slots: Vec<Option<Result<Output, UnitFailure>>> = (0..total).map(|_| None).collect();
        for (rail, id) in joined.into_iter().zip(ids) {
            let settled = rail.map_err(|_| ExecutionError::Lost { id })?;
            for (index, result) in settled {
                slots[index] = Some(result);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(ExecutionError::Lost { id: index as u64 }))
            .collect()
    }
}

impl ExecutionStrategy for StreamStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Stream(self.flavor)
    }

    fn fan_out_join(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        let results = match self.flavor {
            StreamFlavor::Bounded => self.bounded(units),
            StreamFlavor::Rails => self.rails(units)?,
        };
        join_ordered(results)
    }

    fn shutdown(self: Box<Self>, timeout: Duration) -> Result<(), TeardownError> {
        self.runtime.shutdown(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ExecutionMode};
    use crate::recorder::Recorder;
    use crate::unit::WorkloadKind;
    use std::thread;

    fn jittered(unit: &WorkloadUnit, _: Option<&Output>) -> Result<Output, UnitFailure> {
        // Later units finish first so ordering has to be restored by the join.
        thread::sleep(Duration::from_millis(20u64.saturating_sub(unit.id)));
        Ok(Output::Number(unit.id as i64))
    }

    fn strategy(flavor: StreamFlavor, width: usize, workload: Arc<dyn Workload>) -> Box<StreamStrategy> {
        Box::new(StreamStrategy::new(flavor, width, workload).unwrap())
    }

    #[test]
    fn test_bounded_stream_caps_in_flight() {
        let recorder = Arc::new(Recorder::new(jittered));
        let stream = strategy(StreamFlavor::Bounded, 4, recorder.clone());

        let values = stream
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 10))
            .unwrap();
        assert_eq!(values, (0..10).map(Output::Number).collect::<Vec<_>>());
        assert_eq!(recorder.invocations(), 10);
        assert!(recorder.peak() <= 4, "peak {} over width", recorder.peak());

        stream.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_width_one_is_sequential() {
        let recorder = Arc::new(Recorder::new(jittered));
        let stream = strategy(StreamFlavor::Bounded, 1, recorder.clone());

        stream
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 5))
            .unwrap();
        assert_eq!(recorder.peak(), 1);
        assert!(!recorder.any_overlap());

        stream.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_rails_restore_submission_order() {
        let recorder = Arc::new(Recorder::new(jittered));
        let rails = strategy(StreamFlavor::Rails, 3, recorder.clone());

        let values = rails
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 11))
            .unwrap();
        assert_eq!(values, (0..11).map(Output::Number).collect::<Vec<_>>());
        assert!(recorder.peak() <= 3);

        rails.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_rails_wider_than_units() {
        let rails = strategy(StreamFlavor::Rails, 8, Arc::new(jittered));
        let values = rails
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 2))
            .unwrap();
        assert_eq!(values.len(), 2);
        rails.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_stream_failure_runs_everything() {
        let recorder = Arc::new(Recorder::new(
            |unit: &WorkloadUnit, _: Option<&Output>| -> Result<Output, UnitFailure> {
                if unit.id % 4 == 1 {
                    Err(UnitFailure::new(unit, "bad row"))
                } else {
                    Ok(Output::Number(unit.id as i64))
                }
            },
        ));
        let stream = strategy(StreamFlavor::Bounded, 2, recorder.clone());

        let err = stream
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 8))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnitsFailed { failed: 2, total: 8, .. }));
        assert_eq!(err.first_failure().map(|f| f.id), Some(1));
        assert_eq!(recorder.invocations(), 8);

        stream.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_pipeline_is_unsupported() {
        let stream = strategy(StreamFlavor::Rails, 2, Arc::new(jittered));
        let err = stream
            .pipeline(WorkloadUnit::batch(WorkloadKind::Compute, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Config(ConfigError::UnsupportedMode {
                mode: ExecutionMode::Pipeline,
                ..
            })
        ));
        stream.shutdown(Duration::from_secs(5)).unwrap();
    }
}
