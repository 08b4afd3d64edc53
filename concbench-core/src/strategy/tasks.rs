//! Task Per Unit
//!
//! One Tokio task per unit, multiplexed over `concurrency_limit` carrier threads.
//! Nothing bounds the number of tasks. Unstructured tasks all run to completion
//! no matter what their siblings do. Structured tasks share a cancellation token
//! inside one `JoinSet` and start in submission order: the driver launches the
//! next task only once the previous one is running. The first failure cancels
//! the token, which stops further launches and aborts every task not yet past
//! its start. The join still waits for all of them to settle before reporting
//! one aggregated failure.

use super::runtime::{ScopedRuntime, ScopedRuntimeOptions};
use crate::config::{Strategy, TaskFlavor};
use crate::outcome::{ExecutionError, join_ordered};
use crate::scope::{ExecutionStrategy, ScopeError, TeardownError};
use crate::unit::{Output, UnitFailure, Workload, WorkloadUnit, invoke_caught};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) struct TaskStrategy {
    flavor: TaskFlavor,
    workload: Arc<dyn Workload>,
    runtime: ScopedRuntime,
}

/// How a structured task ended
enum Settled {
    Done(Result<Output, UnitFailure>),
    Skipped,
}

impl TaskStrategy {
    pub(crate) fn new(
        flavor: TaskFlavor,
        carriers: usize,
        workload: Arc<dyn Workload>,
    ) -> Result<Self, ScopeError> {
        let runtime = ScopedRuntime::create(ScopedRuntimeOptions {
            resource: match flavor {
                TaskFlavor::Unstructured => "task runtime",
                TaskFlavor::Structured => "structured task runtime",
            },
            thread_name: "concbench-carrier",
            worker_threads: carriers,
            max_blocking_threads: None,
        })?;

        Ok(Self {
            flavor,
            workload,
            runtime,
        })
    }

    fn unstructured(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        let runtime = self.runtime.runtime();
        let tasks: Vec<_> = units
            .into_iter()
            .map(|unit| {
                let workload = Arc::clone(&self.workload);
                let task = runtime.spawn(async move { invoke_caught(workload.as_ref(), &unit, None) });
                (unit, task)
            })
            .collect();

        let results = runtime.block_on(async {
            let mut results = Vec::with_capacity(tasks.len());
            for (unit, task) in tasks {
                results.push(task.await.unwrap_or_else(|e| {
                    Err(UnitFailure::new(&unit, format!("task failed: {e}")))
                }));
            }
            results
        });
        join_ordered(results)
    }

    fn structured(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        let total = units.len();
        let ids: Vec<u64> = units.iter().map(|unit| unit.id).collect();
        let token = CancellationToken::new();

        self.runtime.runtime().block_on(async {
            let mut scope = JoinSet::new();
            let mut cancelled = 0;
            for (index, unit) in units.into_iter().enumerate() {
                if token.is_cancelled() {
                    cancelled += 1;
                    continue;
                }
                let workload = Arc::clone(&self.workload);
                let token = token.clone();
                let (started, on_start) = oneshot::channel();
                scope.spawn(async move {
                    let _ = started.send(());
                    if token.is_cancelled() {
                        return (index, Settled::Skipped);
                    }
                    let result = invoke_caught(workload.as_ref(), &unit, None);
                    if result.is_err() {
                        token.cancel();
                    }
                    (index, Settled::Done(result))
                });
                // The next sibling is launched only once this one is running.
                let _ = on_start.await;
            }

            let mut values: Vec<Option<Output>> = (0..total).map(|_| None).collect();
            let mut first: Option<(usize, UnitFailure)> = None;

            while let Some(joined) = scope.join_next().await {
                match joined {
                    Ok((index, Settled::Done(Ok(value)))) => values[index] = Some(value),
                    Ok((index, Settled::Done(Err(failure)))) => {
                        if first.is_none() {
                            token.cancel();
                            scope.abort_all();
                        }
                        if first.as_ref().is_none_or(|(earliest, _)| index < *earliest) {
                            first = Some((index, failure));
                        }
                    }
                    Ok((_, Settled::Skipped)) => cancelled += 1,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(_) => cancelled += 1,
                }
            }

            if let Some((_, first)) = first {
                debug!(cancelled, total, "structured scope cancelled");
                return Err(ExecutionError::Cancelled {
                    first,
                    cancelled,
                    total,
                });
            }

            values
                .into_iter()
                .zip(ids)
                .map(|(value, id)| value.ok_or(ExecutionError::Lost { id }))
                .collect()
        })
    }
}

impl ExecutionStrategy for TaskStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Tasks(self.flavor)
    }

    fn fan_out_join(&self, units: Vec<WorkloadUnit>) -> Result<Vec<Output>, ExecutionError> {
        match self.flavor {
            TaskFlavor::Unstructured => self.unstructured(units),
            TaskFlavor::Structured => self.structured(units),
        }
    }

    fn shutdown(self: Box<Self>, timeout: Duration) -> Result<(), TeardownError> {
        self.runtime.shutdown(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Recorder;
    use crate::unit::WorkloadKind;
    use std::thread;

    fn fails_at_five(unit: &WorkloadUnit, _: Option<&Output>) -> Result<Output, UnitFailure> {
        if unit.id == 5 {
            return Err(UnitFailure::new(unit, "unit five rejected"));
        }
        thread::sleep(Duration::from_millis(50));
        Ok(Output::Number(unit.id as i64))
    }

    fn tasks(flavor: TaskFlavor, carriers: usize, workload: Arc<dyn Workload>) -> Box<TaskStrategy> {
        Box::new(TaskStrategy::new(flavor, carriers, workload).unwrap())
    }

    #[test]
    fn test_unstructured_returns_in_order() {
        let recorder = Arc::new(Recorder::new(|unit: &WorkloadUnit, _: Option<&Output>| {
            Ok::<_, UnitFailure>(Output::Number(unit.id as i64 * 2))
        }));
        let strategy = tasks(TaskFlavor::Unstructured, 2, recorder.clone());

        let values = strategy
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 50))
            .unwrap();
        assert_eq!(values, (0..50).map(|n| Output::Number(n * 2)).collect::<Vec<_>>());
        assert_eq!(recorder.invocations(), 50);

        strategy.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_unstructured_runs_every_unit() {
        let recorder = Arc::new(Recorder::new(fails_at_five));
        let strategy = tasks(TaskFlavor::Unstructured, 2, recorder.clone());

        let err = strategy
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 10))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnitsFailed { failed: 1, total: 10, .. }));
        assert_eq!(recorder.invocations(), 10);

        strategy.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_structured_cancels_siblings() {
        let recorder = Arc::new(Recorder::new(fails_at_five));
        let strategy = tasks(TaskFlavor::Structured, 2, recorder.clone());

        let err = strategy
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 10))
            .unwrap_err();
        match err {
            ExecutionError::Cancelled {
                first,
                cancelled,
                total,
            } => {
                assert_eq!(first.id, 5);
                assert_eq!(total, 10);
                assert!(cancelled >= 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(recorder.invocations() < 10, "{} invocations", recorder.invocations());

        strategy.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_structured_starts_in_submission_order() {
        let recorder = Arc::new(Recorder::new(|unit: &WorkloadUnit, _: Option<&Output>| {
            Ok::<_, UnitFailure>(Output::Number(unit.id as i64))
        }));
        let strategy = tasks(TaskFlavor::Structured, 1, recorder.clone());

        strategy
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 40))
            .unwrap();
        let started: Vec<u64> = recorder.spans().iter().map(|span| span.id).collect();
        assert_eq!(started, (0..40).collect::<Vec<_>>());

        strategy.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_structured_cancels_siblings_repeatedly() {
        let recorder = Arc::new(Recorder::new(fails_at_five));
        let strategy = tasks(TaskFlavor::Structured, 2, recorder.clone());

        for _ in 0..3 {
            recorder.reset();
            let err = strategy
                .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 10))
                .unwrap_err();
            assert!(
                matches!(err, ExecutionError::Cancelled { cancelled, .. } if cancelled > 0),
                "{err}"
            );
            assert!(recorder.invocations() < 10, "{} invocations", recorder.invocations());
            let unit_five = recorder.spans().into_iter().find(|span| span.id == 5);
            assert!(unit_five.is_some());
        }

        strategy.shutdown(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_structured_success_joins_all() {
        let strategy = tasks(
            TaskFlavor::Structured,
            3,
            Arc::new(|unit: &WorkloadUnit, _: Option<&Output>| {
                Ok::<_, UnitFailure>(Output::Number(unit.id as i64))
            }),
        );
        let values = strategy
            .fan_out_join(WorkloadUnit::batch(WorkloadKind::Compute, 30))
            .unwrap();
        assert_eq!(values, (0..30).map(Output::Number).collect::<Vec<_>>());
        strategy.shutdown(Duration::from_secs(5)).unwrap();
    }
}
