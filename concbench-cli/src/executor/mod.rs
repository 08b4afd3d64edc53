//! Trial Executor
//!
//! Runs planned trials and turns their samples into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (from the planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │    trial    │  One scope per trial, warm-up then measurement
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Summary stats + bootstrap CIs (parallel)
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`trial`] - Scoped trial execution and the sequential executor
//! - [`report`] - Report building with bootstrap CIs
//! - [`metadata`] - System metadata collection

mod metadata;
mod report;
mod trial;

// Re-export public API
pub use metadata::build_report_meta;
pub use report::{build_report, report_config};
pub use trial::{Executor, TrialError, TrialResult, TrialSettings, run_trial};
