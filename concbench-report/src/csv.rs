//! CSV Output
//!
//! One row per trial. Failed trials keep their parameters and leave the timing
//! columns empty.

use crate::report::{Report, TrialReport, TrialStatus};

const HEADER: &str = "id,strategy,mode,workload,operation_count,concurrency_limit,lock,status,\
invocations,mean_ns,median_ns,std_dev_ns,p99_ns,error_ns,seconds_per_op,failure";

/// Render the report as CSV
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for trial in &report.results {
        out.push_str(&row(trial));
        out.push('\n');
    }
    out
}

fn row(trial: &TrialReport) -> String {
    let status = match trial.status {
        TrialStatus::Passed => "passed",
        TrialStatus::Failed => "failed",
        TrialStatus::TeardownFailed => "teardown_failed",
    };
    let timings = match &trial.metrics {
        Some(m) => format!(
            "{},{:.1},{:.1},{:.1},{:.1},{:.1},{:.9}",
            m.invocations,
            m.mean_ns,
            m.median_ns,
            m.std_dev_ns,
            m.p99_ns,
            m.error_ns(),
            m.seconds_per_op
        ),
        None => ",,,,,,".to_string(),
    };
    let failure = trial
        .failure
        .as_ref()
        .map(|f| escape(&f.message))
        .unwrap_or_default();

    let lock = trial.lock.map(|lock| lock.to_string()).unwrap_or_default();

    format!(
        "{},{},{},{},{},{},{},{},{},{}",
        escape(&trial.id),
        trial.strategy,
        trial.mode,
        trial.workload,
        trial.operation_count,
        trial.concurrency_limit,
        lock,
        status,
        timings,
        failure
    )
}

/// Quote a field if it contains a separator, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
