#![warn(missing_docs)]
//! ConcBench Statistics
//!
//! Analysis of per-invocation durations collected during a trial's measurement
//! phase:
//! - Outlier detection with IQR fences
//! - Percentiles over every sample, outliers included
//! - Summary statistics (central tendency over cleaned samples)
//! - Bootstrap confidence interval for the reported mean

mod interval;
mod outliers;
mod percentiles;
mod summary;

pub use interval::{
    ConfidenceInterval, IntervalConfig, IntervalError, MIN_BOOTSTRAP_SAMPLES, compute_interval,
};
pub use outliers::{OutlierAnalysis, OutlierMethod, detect_outliers};
pub use percentiles::compute_percentile;
pub use summary::{SummaryStatistics, compute_summary};
