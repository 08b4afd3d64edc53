#![warn(missing_docs)]
//! ConcBench Report - Output Formats
//!
//! Turns executed trials into:
//! - JSON (machine-readable, full metrics)
//! - CSV (one row per trial)
//! - Human ranking (per workload/mode/operation count, fastest first)

mod csv;
mod human;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use human::{format_duration, format_human_output};
pub use json::{generate_json_report, parse_json_report};
pub use report::{
    FailureInfo, Report, ReportConfig, ReportMeta, ReportSummary, SCHEMA_VERSION, SystemInfo,
    TrialMetrics, TrialReport, TrialStatus,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Ranked terminal tables
    #[default]
    Human,
    /// JSON with full metrics
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl OutputFormat {
    /// File extension used when writing to a directory
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Human => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }

    /// Render `report` in this format
    pub fn render(self, report: &Report) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Human => Ok(format_human_output(report)),
            OutputFormat::Json => generate_json_report(report),
            OutputFormat::Csv => Ok(generate_csv_report(report)),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
