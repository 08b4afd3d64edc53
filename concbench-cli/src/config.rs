//! Configuration loading from concbench.toml
//!
//! ConcBench configuration can be specified in a `concbench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use concbench_core::{ExecutionMode, Strategy, WorkloadKind};
use concbench_scenarios::ScenarioConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// File name looked up by [`ConcConfig::discover`]
pub const CONFIG_FILE: &str = "concbench.toml";

/// ConcBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConcConfig {
    /// Measurement loop settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Parameter space to sweep
    #[serde(default)]
    pub params: ParamsConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Cost knobs for the simulated workloads
    #[serde(default)]
    pub scenarios: ScenarioConfig,
}

/// Runner configuration for trial execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Warm-up duration per trial, results discarded (e.g., "3s")
    #[serde(default = "default_warmup")]
    pub warmup_time: String,
    /// Measurement duration per trial (e.g., "5s")
    #[serde(default = "default_measurement")]
    pub measurement_time: String,
    /// Fixed sample count: skip warm-up, run exactly N invocations
    #[serde(default)]
    pub samples: Option<u64>,
    /// Minimum measured invocations per trial
    #[serde(default)]
    pub min_invocations: Option<u64>,
    /// Maximum measured invocations per trial
    #[serde(default)]
    pub max_invocations: Option<u64>,
    /// Bounded wait for a trial's workers to exit (e.g., "5s")
    #[serde(default = "default_teardown_timeout")]
    pub teardown_timeout: String,
    /// Resamples for the confidence interval (0 skips it)
    #[serde(default = "default_bootstrap_resamples")]
    pub bootstrap_resamples: usize,
    /// Confidence level (e.g., 0.999 for 99.9%)
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_time: default_warmup(),
            measurement_time: default_measurement(),
            samples: None,
            min_invocations: None,
            max_invocations: None,
            teardown_timeout: default_teardown_timeout(),
            bootstrap_resamples: default_bootstrap_resamples(),
            confidence_level: default_confidence_level(),
        }
    }
}

fn default_warmup() -> String {
    "3s".to_string()
}
fn default_measurement() -> String {
    "5s".to_string()
}
fn default_teardown_timeout() -> String {
    "5s".to_string()
}
fn default_bootstrap_resamples() -> usize {
    10_000
}
fn default_confidence_level() -> f64 {
    0.999
}

/// Parameter space crossed by the planner
///
/// Names are kept as strings here and resolved by the planner, so an unknown
/// name surfaces as a configuration error naming the offending value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsConfig {
    /// Units per invocation
    #[serde(default = "default_operation_counts")]
    pub operation_counts: Vec<usize>,
    /// Workload kinds
    #[serde(default = "default_workloads")]
    pub workloads: Vec<String>,
    /// Strategy selectors
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,
    /// Execution modes
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
    /// Widths for worker pools and deferred executors
    #[serde(default = "default_pool_widths")]
    pub pool_widths: Vec<usize>,
    /// Concurrency caps for streams
    #[serde(default = "default_stream_widths")]
    pub stream_widths: Vec<usize>,
    /// Carrier threads for task-per-unit (empty = host parallelism)
    #[serde(default)]
    pub carrier_threads: Vec<usize>,
    /// Locks the fixed pool's fan-out units contend for, on top of the unlocked run
    #[serde(default)]
    pub locks: Vec<String>,
    /// Permit counts a bare `semaphore` lock expands over
    #[serde(default = "default_permits")]
    pub permits: Vec<usize>,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            operation_counts: default_operation_counts(),
            workloads: default_workloads(),
            strategies: default_strategies(),
            modes: default_modes(),
            pool_widths: default_pool_widths(),
            stream_widths: default_stream_widths(),
            carrier_threads: Vec::new(),
            locks: Vec::new(),
            permits: default_permits(),
        }
    }
}

fn default_operation_counts() -> Vec<usize> {
    vec![10, 100]
}
fn default_workloads() -> Vec<String> {
    WorkloadKind::ALL.iter().map(|k| k.name().to_string()).collect()
}
fn default_strategies() -> Vec<String> {
    Strategy::ALL.iter().map(|s| s.name().to_string()).collect()
}
fn default_modes() -> Vec<String> {
    ExecutionMode::ALL.iter().map(|m| m.name().to_string()).collect()
}
fn default_pool_widths() -> Vec<usize> {
    vec![4, 8, 16]
}
fn default_stream_widths() -> Vec<usize> {
    vec![1, 4, 8]
}
fn default_permits() -> Vec<usize> {
    vec![1, 4, 8]
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// When set, every run also writes its report into this directory
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: None,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl ConcConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_from(dir)
    }

    /// Walk up from `dir` looking for `concbench.toml`
    pub fn discover_from(mut dir: PathBuf) -> Option<Self> {
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        warn!("ignoring {}: {}", config_path.display(), e);
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# ConcBench Configuration

[runner]
# Warm-up duration per trial (results discarded)
warmup_time = "3s"
# Measurement duration per trial
measurement_time = "5s"
# Bounded wait for a trial's workers to exit before it is reported as leaked
teardown_timeout = "5s"
# Fixed sample count: skip warm-up, run exactly N invocations (uncomment to enable)
# samples = 5
# Minimum measured invocations (uncomment to enable)
# min_invocations = 10
# Maximum measured invocations (uncomment to enable)
# max_invocations = 100000
# Resamples for the confidence interval (0 disables it)
bootstrap_resamples = 10000
# Confidence level (0.0 to 1.0)
confidence_level = 0.999

[params]
operation_counts = [10, 100]
workloads = ["database", "network", "compute", "memory-transform", "file-io"]
strategies = [
    "pool-fixed",
    "pool-stealing",
    "deferred",
    "stream",
    "stream-rails",
    "tasks",
    "tasks-structured",
]
modes = ["fan-out", "pipeline"]
# Widths for pool-fixed, pool-stealing and deferred
pool_widths = [4, 8, 16]
# Concurrency caps for stream and stream-rails
stream_widths = [1, 4, 8]
# Carrier threads for tasks and tasks-structured (empty = available parallelism)
carrier_threads = []
# Extra pool-fixed fan-out trials under a shared lock: mutex, rwlock, semaphore, atomic
locks = []
# Permit counts for a bare "semaphore" lock
permits = [1, 4, 8]

[output]
# Default output format: human, json, csv
format = "human"
# Also write every report into this directory (uncomment to enable)
# directory = "target/concbench"

[scenarios]
# Query parameters appended per database unit
param_count = 50
# Attempts made by the network workload before giving up
max_attempts = 3
# An attempt fails when (id + attempt) % fail_modulus < fail_threshold
fail_modulus = 10
fail_threshold = 3
# Compute iterations per unit id
compute_scale = 100
# Upper bound of the memory transform's source range
dataset_size = 1000
# Pseudo-lines generated per file unit
file_lines = 1000
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if value < 0.0 {
            return Err(anyhow::anyhow!("Negative duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }

    /// [`ConcConfig::parse_duration`] as a `Duration`
    pub fn duration(s: &str) -> anyhow::Result<Duration> {
        Self::parse_duration(s).map(Duration::from_nanos)
    }
}
