//! Report Building
//!
//! Turns trial results into a [`Report`]: summary statistics per trial, then a
//! bootstrap interval around each mean. Bootstrap resampling is the expensive
//! part and runs across trials on rayon's global pool, after every trial's
//! scope has already been released.

use super::trial::{TrialResult, TrialSettings};
use super::metadata::build_report_meta;
use concbench_report::{
    FailureInfo, Report, ReportConfig, ReportSummary, TrialMetrics, TrialReport,
};
use concbench_stats::{IntervalConfig, OutlierMethod, compute_interval, compute_summary};
use rayon::prelude::*;
use tracing::debug;

/// Runner settings as recorded in report metadata
pub fn report_config(settings: &TrialSettings, interval: &IntervalConfig) -> ReportConfig {
    ReportConfig {
        warmup_time_ns: settings.warmup_time.as_nanos() as u64,
        measurement_time_ns: settings.measurement_time.as_nanos() as u64,
        min_invocations: settings.min_invocations,
        max_invocations: settings.max_invocations,
        samples: settings.samples,
        teardown_timeout_ms: settings.teardown_timeout.as_millis() as u64,
        confidence_level: interval.confidence_level,
    }
}

/// Build a complete Report from trial results
///
/// `interval.resamples == 0` skips the bootstrap; metrics then carry the point
/// estimate as both bounds.
pub fn build_report(
    results: &[TrialResult],
    settings: &TrialSettings,
    interval: &IntervalConfig,
    total_duration_ms: f64,
) -> Report {
    let metrics: Vec<Option<TrialMetrics>> = results
        .par_iter()
        .map(|result| {
            if !result.status.has_timings() || result.samples.is_empty() {
                return None;
            }
            let stats = compute_summary(&result.samples, OutlierMethod::default());
            let metrics = TrialMetrics::from(&stats);
            if interval.resamples == 0 {
                return Some(metrics);
            }
            match compute_interval(&result.samples, interval) {
                Ok(ci) => Some(metrics.with_interval(&ci)),
                Err(e) => {
                    debug!(trial = %result.config, "no confidence interval: {}", e);
                    Some(metrics)
                }
            }
        })
        .collect();

    let trials: Vec<TrialReport> = results
        .iter()
        .zip(metrics)
        .map(|(result, metrics)| {
            let mut report = TrialReport::new(&result.config, result.status);
            report.metrics = metrics;
            report.failure = failure_info(result);
            report
        })
        .collect();

    let summary = ReportSummary::from_results(&trials, total_duration_ms);
    Report {
        meta: build_report_meta(report_config(settings, interval)),
        results: trials,
        summary,
    }
}

fn failure_info(result: &TrialResult) -> Option<FailureInfo> {
    match (&result.failure, &result.leak) {
        (Some(failure), None) => Some(FailureInfo {
            kind: failure.kind().to_string(),
            message: failure.to_string(),
        }),
        (Some(failure), Some(leak)) => Some(FailureInfo {
            kind: failure.kind().to_string(),
            message: format!("{failure}; teardown also failed: {leak}"),
        }),
        (None, Some(leak)) => Some(FailureInfo {
            kind: "teardown".to_string(),
            message: leak.to_string(),
        }),
        (None, None) => None,
    }
}
