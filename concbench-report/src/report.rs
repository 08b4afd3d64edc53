//! Report Data Structures

use chrono::{DateTime, Utc};
use concbench_core::{ExecutionMode, LockKind, RunConfiguration, Strategy, WorkloadKind};
use concbench_stats::{ConfidenceInterval, SummaryStatistics};
use serde::{Deserialize, Serialize};

/// Current JSON schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub results: Vec<TrialReport>,
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Runner settings captured in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub warmup_time_ns: u64,
    pub measurement_time_ns: u64,
    pub min_invocations: u64,
    pub max_invocations: u64,
    pub samples: Option<u64>,
    pub teardown_timeout_ms: u64,
    pub confidence_level: f64,
}

/// Host the run executed on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// How a trial ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    /// Measured and released cleanly
    Passed,
    /// A unit failed or the configuration was rejected; no timings
    Failed,
    /// Measured, but the scope did not release within its bounded wait
    TeardownFailed,
}

impl TrialStatus {
    /// Whether the trial produced timings
    pub fn has_timings(self) -> bool {
        !matches!(self, TrialStatus::Failed)
    }
}

/// One trial in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    pub id: String,
    pub strategy: Strategy,
    pub mode: ExecutionMode,
    pub workload: WorkloadKind,
    pub operation_count: usize,
    pub concurrency_limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockKind>,
    pub status: TrialStatus,
    pub metrics: Option<TrialMetrics>,
    pub failure: Option<FailureInfo>,
}

impl TrialReport {
    /// Report entry for `config` with no result attached yet
    pub fn new(config: &RunConfiguration, status: TrialStatus) -> Self {
        Self {
            id: config.id(),
            strategy: config.strategy(),
            mode: config.mode(),
            workload: config.workload(),
            operation_count: config.operation_count(),
            concurrency_limit: config.concurrency_limit(),
            lock: config.lock(),
            status,
            metrics: None,
            failure: None,
        }
    }

    /// Strategy name, with the lock appended for locked trials (`pool-fixed+mutex`)
    pub fn label(&self) -> String {
        match self.lock {
            Some(lock) => format!("{}+{}", self.strategy, lock),
            None => self.strategy.to_string(),
        }
    }

    /// Mean duration of one invocation, if measured
    pub fn mean_ns(&self) -> Option<f64> {
        self.metrics.as_ref().map(|metrics| metrics.mean_ns)
    }
}

/// Timing metrics of one trial (per invocation of the whole operation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialMetrics {
    pub invocations: usize,
    /// Plain average over every sample; the interval brackets this value
    pub mean_ns: f64,
    /// Average with IQR outliers removed
    pub trimmed_mean_ns: f64,
    pub median_ns: f64,
    pub std_dev_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub p50_ns: f64,
    pub p90_ns: f64,
    pub p95_ns: f64,
    pub p99_ns: f64,
    pub outliers: usize,
    pub ci_lower_ns: f64,
    pub ci_upper_ns: f64,
    pub ci_level: f64,
    pub seconds_per_op: f64,
}

impl TrialMetrics {
    /// `±` error around the mean (half the interval width)
    pub fn error_ns(&self) -> f64 {
        (self.ci_upper_ns - self.ci_lower_ns) / 2.0
    }

    /// Attach a confidence interval
    pub fn with_interval(mut self, interval: &ConfidenceInterval) -> Self {
        self.ci_lower_ns = interval.lower;
        self.ci_upper_ns = interval.upper;
        self.ci_level = interval.level;
        self
    }
}

impl From<&SummaryStatistics> for TrialMetrics {
    fn from(stats: &SummaryStatistics) -> Self {
        Self {
            invocations: stats.sample_count,
            mean_ns: stats.raw_mean,
            trimmed_mean_ns: stats.mean,
            median_ns: stats.median,
            std_dev_ns: stats.std_dev,
            min_ns: stats.min,
            max_ns: stats.max,
            p50_ns: stats.p50,
            p90_ns: stats.p90,
            p95_ns: stats.p95,
            p99_ns: stats.p99,
            outliers: stats.outlier_count,
            // Filled by the bootstrap when there are enough samples
            ci_lower_ns: stats.raw_mean,
            ci_upper_ns: stats.raw_mean,
            ci_level: 0.0,
            seconds_per_op: stats.raw_mean / 1e9,
        }
    }
}

/// Why a trial failed or leaked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
}

/// Report totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_trials: usize,
    pub passed: usize,
    pub failed: usize,
    pub teardown_failed: usize,
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Tally trial statuses
    pub fn from_results(results: &[TrialReport], total_duration_ms: f64) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total_trials: results.len(),
            passed: count(TrialStatus::Passed),
            failed: count(TrialStatus::Failed),
            teardown_failed: count(TrialStatus::TeardownFailed),
            total_duration_ms,
        }
    }

    /// Whether every trial passed cleanly
    pub fn all_passed(&self) -> bool {
        self.passed == self.total_trials
    }
}
