//! Integration tests for ConcBench
//!
//! These tests drive every strategy through its resource scope against the
//! default simulated workloads and check the end-to-end behavior of a run.

use concbench::{
    ConfigError, DEFAULT_TEARDOWN_TIMEOUT, ExecutionError, ExecutionMode, ExecutionOutcome,
    LockKind, Output, PoolFlavor, Recorder, READ_UNIT, ResourceScope, RunConfiguration,
    ScenarioWorkload, Strategy, StreamFlavor, TaskFlavor, TrialSettings, TrialStatus,
    UnitFailure, Workload, WorkloadKind, WorkloadUnit, run_trial,
};
use concbench_cli::{ConcConfig, build_plan, build_report};
use concbench_report::{OutputFormat, parse_json_report};
use concbench_stats::IntervalConfig;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn config(
    strategy: Strategy,
    mode: ExecutionMode,
    workload: WorkloadKind,
    n: usize,
    width: usize,
) -> RunConfiguration {
    RunConfiguration::new(strategy, mode, workload, n, width).unwrap()
}

/// Run one invocation in a fresh scope and require a clean release
fn run_once(config: RunConfiguration, workload: Arc<dyn Workload>) -> ExecutionOutcome {
    let run = ResourceScope::scoped(config, workload, DEFAULT_TEARDOWN_TIMEOUT, |scope| {
        scope.run_configured()
    })
    .unwrap();
    run.teardown.unwrap();
    run.value.unwrap()
}

/// Bounded stream, N=10, width 4: ten ordered outcomes and never more than four in flight
#[test]
fn test_stream_fan_out_scenario() {
    let recorder = Arc::new(Recorder::new(ScenarioWorkload::default()));
    let outcome = run_once(
        config(
            Strategy::Stream(StreamFlavor::Bounded),
            ExecutionMode::FanOut,
            WorkloadKind::Database,
            10,
            4,
        ),
        recorder.clone(),
    );

    assert_eq!(outcome.len(), 10);
    for (index, value) in outcome.values().iter().enumerate() {
        match value {
            Output::Record { id, .. } => assert_eq!(*id, index as u64),
            other => panic!("unexpected value {other:?}"),
        }
    }
    assert_eq!(recorder.invocations(), 10);
    assert!(recorder.peak() <= 4, "peak {} exceeds width", recorder.peak());
}

/// Fixed pool, width 8, N=100 pipeline: one outcome from 100 strictly sequential links
#[test]
fn test_fixed_pool_pipeline_scenario() {
    let recorder = Arc::new(Recorder::new(ScenarioWorkload::default()));
    let outcome = run_once(
        config(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::Pipeline,
            WorkloadKind::Compute,
            100,
            8,
        ),
        recorder.clone(),
    );

    assert!(matches!(outcome, ExecutionOutcome::Pipeline(Output::Linked { .. })));
    assert_eq!(outcome.len(), 1);
    assert_eq!(recorder.invocations(), 100);
    assert_eq!(recorder.peak(), 1);
    assert!(!recorder.any_overlap());

    let mut spans = recorder.spans();
    spans.sort_by_key(|span| span.start);
    let ids: Vec<u64> = spans.iter().map(|span| span.id).collect();
    assert_eq!(ids, (0..100).collect::<Vec<_>>());
    assert!(!spans[0].chained);
    assert!(spans[1..].iter().all(|span| span.chained));
    for pair in spans.windows(2) {
        assert!(pair[0].end < pair[1].start);
    }
}

fn fails_at_five(unit: &WorkloadUnit, _: Option<&Output>) -> Result<Output, UnitFailure> {
    if unit.id == 5 {
        return Err(UnitFailure::new(unit, "connection refused"));
    }
    thread::sleep(Duration::from_millis(50));
    Ok(Output::Number(unit.id as i64))
}

/// Structured tasks: a failure at id 5 cancels outstanding siblings
#[test]
fn test_structured_tasks_cancel_scenario() {
    let recorder = Arc::new(Recorder::new(fails_at_five));
    let scope = ResourceScope::setup(
        config(
            Strategy::Tasks(TaskFlavor::Structured),
            ExecutionMode::FanOut,
            WorkloadKind::Network,
            10,
            2,
        ),
        recorder.clone(),
        DEFAULT_TEARDOWN_TIMEOUT,
    )
    .unwrap();

    let err = scope.run_configured().unwrap_err();
    match &err {
        ExecutionError::Cancelled {
            first,
            cancelled,
            total,
        } => {
            assert_eq!(first.id, 5);
            assert_eq!(*total, 10);
            assert!(*cancelled > 0);
        }
        other => panic!("expected an aggregated cancellation, got {other}"),
    }
    assert!(recorder.invocations() < 10, "{} invocations", recorder.invocations());
    scope.teardown().unwrap();
}

/// Unstructured tasks: every unit runs despite the failure
#[test]
fn test_unstructured_tasks_run_everything() {
    let recorder = Arc::new(Recorder::new(fails_at_five));
    let scope = ResourceScope::setup(
        config(
            Strategy::Tasks(TaskFlavor::Unstructured),
            ExecutionMode::FanOut,
            WorkloadKind::Network,
            10,
            2,
        ),
        recorder.clone(),
        DEFAULT_TEARDOWN_TIMEOUT,
    )
    .unwrap();

    let err = scope.run_configured().unwrap_err();
    assert_eq!(err.first_failure().map(|f| f.id), Some(5));
    assert_eq!(recorder.invocations(), 10);
    scope.teardown().unwrap();
}

/// Fixed pool under a read-write lock: every tenth unit writes, the rest read
#[test]
fn test_fixed_pool_read_write_lock() {
    let workload = ScenarioWorkload::default();
    let outcome = run_once(
        config(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::FanOut,
            WorkloadKind::Network,
            20,
            4,
        )
        .with_lock(LockKind::RwLock)
        .unwrap(),
        Arc::new(workload.clone()),
    );

    let read = workload.invoke(&READ_UNIT, None).unwrap();
    for (index, value) in outcome.values().iter().enumerate() {
        if index % 10 == 0 {
            let unit = WorkloadUnit::new(index as u64, WorkloadKind::Network);
            assert_eq!(*value, workload.invoke(&unit, None).unwrap());
        } else {
            assert_eq!(*value, read);
        }
    }
}

/// A one-permit semaphore lets a single unit in at a time
#[test]
fn test_fixed_pool_single_permit_semaphore() {
    let recorder = Arc::new(Recorder::new(ScenarioWorkload::default()));
    let outcome = run_once(
        config(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::FanOut,
            WorkloadKind::Database,
            16,
            8,
        )
        .with_lock(LockKind::Semaphore(1))
        .unwrap(),
        recorder.clone(),
    );

    assert_eq!(outcome.len(), 16);
    assert_eq!(recorder.invocations(), 16);
    assert_eq!(recorder.peak(), 1);
    assert!(!recorder.any_overlap());
}

/// Every strategy returns the values a plain sequential loop would
#[test]
fn test_strategies_agree_on_fan_out_values() {
    let workload = ScenarioWorkload::default();
    for kind in WorkloadKind::ALL {
        let expected: Vec<Output> = WorkloadUnit::batch(kind, 12)
            .iter()
            .map(|unit| workload.invoke(unit, None).unwrap())
            .collect();

        for strategy in Strategy::ALL {
            let outcome = run_once(
                config(strategy, ExecutionMode::FanOut, kind, 12, 3),
                Arc::new(workload.clone()),
            );
            assert_eq!(outcome.values(), expected.as_slice(), "{strategy} on {kind}");
        }
    }
}

/// Pipeline-capable strategies build the same chain
#[test]
fn test_pipeline_strategies_agree() {
    let pipelines: Vec<Output> = Strategy::ALL
        .into_iter()
        .filter(|s| s.supports(ExecutionMode::Pipeline))
        .map(|strategy| {
            let outcome = run_once(
                config(strategy, ExecutionMode::Pipeline, WorkloadKind::FileIo, 8, 4),
                Arc::new(ScenarioWorkload::default()),
            );
            outcome.values()[0].clone()
        })
        .collect();

    assert_eq!(pipelines.len(), 3);
    assert!(pipelines.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Same configuration twice against a deterministic workload gives the same values
#[test]
fn test_idempotent_runs() {
    for mode in ExecutionMode::ALL {
        let config = config(Strategy::Deferred, mode, WorkloadKind::Network, 20, 4);
        let first = run_once(config, Arc::new(ScenarioWorkload::default()));
        let second = run_once(config, Arc::new(ScenarioWorkload::default()));
        assert_eq!(first, second);
    }
}

/// Invalid parameters are rejected before any scope exists
#[test]
fn test_configuration_errors() {
    let err = RunConfiguration::new(
        Strategy::Stream(StreamFlavor::Rails),
        ExecutionMode::Pipeline,
        WorkloadKind::Compute,
        10,
        4,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedMode { .. }));

    assert_eq!(
        RunConfiguration::new(
            Strategy::Deferred,
            ExecutionMode::FanOut,
            WorkloadKind::Compute,
            10,
            0,
        )
        .unwrap_err(),
        ConfigError::ZeroConcurrency
    );

    assert!(matches!(
        "quantum".parse::<WorkloadKind>(),
        Err(ConfigError::UnknownWorkload(_))
    ));
    assert!(matches!(
        "green-threads".parse::<Strategy>(),
        Err(ConfigError::UnknownStrategy(_))
    ));
}

/// Measured trials for a small plan end up in a parseable JSON report
#[test]
fn test_trials_to_json_report() {
    let mut conc = ConcConfig::default();
    conc.params.operation_counts = vec![4];
    conc.params.workloads = vec!["compute".to_string()];
    conc.params.strategies = vec!["pool-stealing".to_string(), "tasks".to_string()];
    conc.params.modes = vec!["fan-out".to_string()];
    conc.params.pool_widths = vec![2];
    conc.params.carrier_threads = vec![2];

    let plan = build_plan(&conc.params, None).unwrap();
    assert_eq!(plan.len(), 2);

    let settings = TrialSettings::fixed(5, DEFAULT_TEARDOWN_TIMEOUT);
    let workload: Arc<dyn Workload> = Arc::new(ScenarioWorkload::default());
    let results: Vec<_> = plan
        .trials
        .iter()
        .map(|trial| run_trial(*trial, Arc::clone(&workload), &settings))
        .collect();
    assert!(results.iter().all(|r| r.status == TrialStatus::Passed));

    let interval = IntervalConfig {
        resamples: 200,
        ..IntervalConfig::default()
    };
    let report = build_report(&results, &settings, &interval, 12.0);
    let json = OutputFormat::Json.render(&report).unwrap();
    let parsed = parse_json_report(&json).unwrap();

    assert_eq!(parsed.results.len(), 2);
    assert_eq!(parsed.summary.passed, 2);
    for trial in &parsed.results {
        let metrics = trial.metrics.as_ref().unwrap();
        assert_eq!(metrics.invocations, 5);
        assert!(metrics.mean_ns > 0.0);
    }

    let human = OutputFormat::Human.render(&report).unwrap();
    assert!(human.contains("compute / fan-out / n=4"));
}

/// A failing workload yields a failed trial with its cause and no timings
#[test]
fn test_failed_trial_reports_cause() {
    let settings = TrialSettings::fixed(3, DEFAULT_TEARDOWN_TIMEOUT);
    let result = run_trial(
        config(
            Strategy::WorkerPool(PoolFlavor::Fixed),
            ExecutionMode::Pipeline,
            WorkloadKind::Network,
            10,
            4,
        ),
        Arc::new(fails_at_five),
        &settings,
    );

    assert_eq!(result.status, TrialStatus::Failed);
    assert!(result.samples.is_empty());
    assert!(result.leak.is_none());
    let report = build_report(&[result], &settings, &IntervalConfig::default(), 1.0);
    let failure = report.results[0].failure.as_ref().unwrap();
    assert_eq!(failure.kind, "chain_broken");
    assert!(failure.message.contains("connection refused"));
}
