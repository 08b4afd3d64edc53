//! Terminal Ranking
//!
//! Trials that share a workload, mode and operation count are directly
//! comparable, so each such group is ranked fastest first, followed by its best
//! and worst lines. Failed trials are listed after all rankings.

use crate::report::{Report, TrialReport, TrialStatus};
use std::collections::BTreeMap;
use std::fmt::Write;

const RULE_WIDTH: usize = 72;

/// Human-readable duration for a nanosecond value
pub fn format_duration(ns: f64) -> String {
    let abs = ns.abs();
    if abs >= 1e9 {
        format!("{:.3} s", ns / 1e9)
    } else if abs >= 1e6 {
        format!("{:.3} ms", ns / 1e6)
    } else if abs >= 1e3 {
        format!("{:.3} µs", ns / 1e3)
    } else {
        format!("{ns:.1} ns")
    }
}

/// Format a report as ranked tables for the terminal
pub fn format_human_output(report: &Report) -> String {
    let mut out = String::new();
    let rule = "-".repeat(RULE_WIDTH);

    let _ = writeln!(out, "\nConcBench Results");
    let _ = writeln!(out, "{}\n", "=".repeat(RULE_WIDTH));

    let mut groups: BTreeMap<(String, String, usize), Vec<&TrialReport>> = BTreeMap::new();
    for trial in report.results.iter().filter(|t| t.status.has_timings()) {
        groups
            .entry((trial.workload.to_string(), trial.mode.to_string(), trial.operation_count))
            .or_default()
            .push(trial);
    }

    for ((workload, mode, count), mut trials) in groups {
        trials.sort_by(|a, b| {
            let a = a.mean_ns().unwrap_or(f64::INFINITY);
            let b = b.mean_ns().unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        });

        let _ = writeln!(out, "{workload} / {mode} / n={count}");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "  {:>3}  {:<24} {:>5}  {:>14}  {:>14}  {:>12}",
            "#", "strategy", "width", "mean", "± error", "s/op"
        );

        for (rank, trial) in trials.iter().enumerate() {
            let Some(metrics) = &trial.metrics else {
                continue;
            };
            let flag = if trial.status == TrialStatus::TeardownFailed {
                "  (teardown failed)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  {:>3}  {:<24} {:>5}  {:>14}  {:>14}  {:>12.9}{}",
                rank + 1,
                trial.label(),
                trial.concurrency_limit,
                format_duration(metrics.mean_ns),
                format!("± {}", format_duration(metrics.error_ns())),
                metrics.seconds_per_op,
                flag
            );
        }

        if let (Some(best), Some(worst)) = (trials.first(), trials.last()) {
            let best_ns = best.mean_ns().unwrap_or(0.0);
            let worst_ns = worst.mean_ns().unwrap_or(0.0);
            let _ = writeln!(
                out,
                "  best:  {} w={} ({})",
                best.label(),
                best.concurrency_limit,
                format_duration(best_ns)
            );
            if trials.len() > 1 {
                let ratio = if best_ns > 0.0 { worst_ns / best_ns } else { 0.0 };
                let _ = writeln!(
                    out,
                    "  worst: {} w={} ({}, {:.2}x slower)",
                    worst.label(),
                    worst.concurrency_limit,
                    format_duration(worst_ns),
                    ratio
                );
            }
        }
        out.push('\n');
    }

    let failed: Vec<_> = report
        .results
        .iter()
        .filter(|t| t.status == TrialStatus::Failed)
        .collect();
    if !failed.is_empty() {
        let _ = writeln!(out, "Failed");
        let _ = writeln!(out, "{rule}");
        for trial in failed {
            let message = trial
                .failure
                .as_ref()
                .map_or("unknown failure", |f| f.message.as_str());
            let _ = writeln!(out, "  ✗ {}: {}", trial.id, message);
        }
        out.push('\n');
    }

    let summary = &report.summary;
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "  Total: {}  Passed: {}  Failed: {}  Teardown failed: {}",
        summary.total_trials, summary.passed, summary.failed, summary.teardown_failed
    );
    let _ = writeln!(out, "  Duration: {:.2} ms", summary.total_duration_ms);
    out
}
