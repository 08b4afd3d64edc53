#![warn(missing_docs)]
//! ConcBench CLI Library
//!
//! Sweeps the configured parameter space (operation count × workload × width ×
//! strategy × mode), runs one scoped trial per combination, and reports one
//! average duration per trial.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     concbench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;

pub use config::{CONFIG_FILE, ConcConfig, OutputConfig, ParamsConfig, RunnerConfig};
pub use executor::{
    Executor, TrialError, TrialResult, TrialSettings, build_report, build_report_meta,
    report_config, run_trial,
};
pub use planner::{ExecutionPlan, build_plan};

use anyhow::Context;
use clap::{Parser, Subcommand};
use concbench_report::OutputFormat;
use concbench_scenarios::ScenarioWorkload;
use concbench_stats::IntervalConfig;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ConcBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "concbench")]
#[command(author, version, about = "ConcBench - concurrency execution-model benchmarks")]
pub struct Cli {
    /// Optional subcommand (List, Run, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter trials by regex on their id (strategy/mode/workload/n=../w=..)
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: human, json, csv (defaults to concbench.toml, then human)
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (discovered from the current directory if not specified)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dry run - list trials without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Warm-up time per trial (e.g. "3s", "500ms")
    #[arg(long)]
    pub warmup: Option<String>,

    /// Measurement time per trial (e.g. "5s")
    #[arg(long)]
    pub measurement: Option<String>,

    /// Fixed sample count mode: skip warm-up, run exactly N invocations
    /// Overrides warmup/measurement/min/max.
    #[arg(long, short = 'n')]
    pub samples: Option<u64>,

    /// Minimum number of measured invocations
    #[arg(long)]
    pub min_invocations: Option<u64>,

    /// Maximum number of measured invocations
    #[arg(long)]
    pub max_invocations: Option<u64>,

    /// Bounded wait for a trial's workers to exit (e.g. "5s")
    #[arg(long)]
    pub teardown_timeout: Option<String>,

    /// Hide the progress bar
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the planned trials
    List,
    /// Run trials (default)
    Run,
    /// Print a default concbench.toml, or write it to a file
    Init {
        /// Where to write the configuration
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the ConcBench CLI with process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the ConcBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose);

    // Explicit --config wins, then concbench.toml discovery, then defaults
    let config = match &cli.config {
        Some(path) => ConcConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ConcConfig::discover().unwrap_or_default(),
    };

    match &cli.command {
        Some(Commands::Init { path, force }) => init_config(path.as_deref(), *force),
        Some(Commands::List) => list_trials(&cli, &config),
        Some(Commands::Run) | None => {
            if cli.dry_run {
                list_trials(&cli, &config)
            } else {
                run_trials(&cli, &config, output_format(&cli, &config)?)
            }
        }
    }
}

/// Report format: `--format` wins over `[output] format`
fn output_format(cli: &Cli, config: &ConcConfig) -> anyhow::Result<OutputFormat> {
    cli.format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "concbench=debug"
    } else {
        "concbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn plan(cli: &Cli, config: &ConcConfig) -> anyhow::Result<ExecutionPlan> {
    let filter = Regex::new(&cli.filter)
        .with_context(|| format!("invalid filter pattern: {}", cli.filter))?;
    build_plan(&config.params, Some(&filter)).context("invalid [params] configuration")
}

fn init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let toml = ConcConfig::default_toml();
    let Some(path) = path else {
        print!("{}", toml);
        return Ok(());
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Configuration written to: {}", path.display());
    Ok(())
}

fn list_trials(cli: &Cli, config: &ConcConfig) -> anyhow::Result<()> {
    let plan = plan(cli, config)?;
    println!("ConcBench Plan:");

    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for trial in &plan.trials {
        groups
            .entry((trial.workload().to_string(), trial.mode().to_string()))
            .or_default()
            .push(trial.id());
    }

    for ((workload, mode), ids) in &groups {
        println!("├── {} / {}", workload, mode);
        for id in ids {
            println!("│   ├── {}", id);
        }
    }

    println!("{} trials planned.", plan.len());
    Ok(())
}

/// Build trial settings by layering: concbench.toml values → CLI overrides.
fn build_trial_settings(cli: &Cli, config: &ConcConfig) -> anyhow::Result<TrialSettings> {
    let runner = &config.runner;
    let teardown_timeout = ConcConfig::duration(
        cli.teardown_timeout
            .as_deref()
            .unwrap_or(&runner.teardown_timeout),
    )
    .context("invalid teardown timeout")?;

    // --samples N: fixed-count mode, no warm-up; CLI wins, then concbench.toml
    if let Some(n) = cli.samples.or(runner.samples) {
        return Ok(TrialSettings::fixed(n, teardown_timeout));
    }

    let warmup_time = ConcConfig::duration(cli.warmup.as_deref().unwrap_or(&runner.warmup_time))
        .context("invalid warm-up time")?;
    let measurement_time = ConcConfig::duration(
        cli.measurement
            .as_deref()
            .unwrap_or(&runner.measurement_time),
    )
    .context("invalid measurement time")?;

    Ok(TrialSettings {
        warmup_time,
        measurement_time,
        min_invocations: cli.min_invocations.or(runner.min_invocations).unwrap_or(1),
        max_invocations: cli
            .max_invocations
            .or(runner.max_invocations)
            .unwrap_or(u64::MAX),
        teardown_timeout,
        samples: None,
    })
}

fn interval_config(config: &ConcConfig) -> IntervalConfig {
    IntervalConfig {
        resamples: config.runner.bootstrap_resamples,
        confidence_level: config.runner.confidence_level,
        ..IntervalConfig::default()
    }
}

fn run_trials(cli: &Cli, config: &ConcConfig, format: OutputFormat) -> anyhow::Result<()> {
    let plan = plan(cli, config)?;
    if plan.is_empty() {
        println!("No trials matched.");
        return Ok(());
    }

    let settings = build_trial_settings(cli, config)?;
    let interval = interval_config(config);
    if interval.resamples > 0 && interval.resamples < 100 {
        eprintln!(
            "Warning: bootstrap_resamples={} is very low; confidence intervals will be unreliable. \
             Use >= 1000 for meaningful results, or 0 to skip the bootstrap.",
            interval.resamples
        );
    }

    let workload = ScenarioWorkload::new(config.scenarios.clone())
        .context("invalid [scenarios] configuration")?;

    let per_trial = match settings.samples {
        Some(n) => format!("{} invocations", n),
        None => format!(
            "{:?} warm-up + {:?} measurement",
            settings.warmup_time, settings.measurement_time
        ),
    };
    println!("Running {} trials ({} each)...\n", plan.len(), per_trial);

    let start_time = Instant::now();
    let mut executor = Executor::new(settings.clone(), Arc::new(workload));
    if cli.quiet {
        executor = executor.quiet();
    }
    let results = executor.execute(&plan.trials);

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    let report = build_report(&results, &settings, &interval, total_duration_ms);
    info!(
        passed = report.summary.passed,
        failed = report.summary.failed,
        teardown_failed = report.summary.teardown_failed,
        "report built"
    );

    let output = format.render(&report)?;

    if let Some(ref path) = cli.output {
        std::fs::write(path, &output)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    if let Some(ref directory) = config.output.directory {
        let path = save_report(Path::new(directory), format, &output)?;
        eprintln!("Report saved to: {}", path.display());
    }

    if !report.summary.all_passed() {
        eprintln!(
            "\n{} trial(s) failed, {} leaked their resources",
            report.summary.failed, report.summary.teardown_failed
        );
        std::process::exit(1);
    }

    Ok(())
}

fn save_report(directory: &Path, format: OutputFormat, output: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let path = directory.join(format!("concbench-{}.{}", stamp, format.extension()));
    std::fs::write(&path, output).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
