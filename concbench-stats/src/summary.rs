//! Summary Statistics
//!
//! The cleaned mean, median and spread leave IQR outliers out. The raw mean,
//! extremes and percentiles cover every sample.

use crate::outliers::{OutlierMethod, detect_outliers};
use crate::percentiles::{compute_percentile, interpolate};
use serde::{Deserialize, Serialize};

/// Summary of one trial's invocation durations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    // Cleaned samples
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,

    // All samples
    pub raw_mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,

    pub sample_count: usize,
    pub outlier_count: usize,
}

impl SummaryStatistics {
    /// Standard deviation relative to the mean, in percent
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.std_dev / self.mean * 100.0
        }
    }
}

/// Summarise `samples` (durations in nanoseconds)
pub fn compute_summary(samples: &[f64], method: OutlierMethod) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let analysis = detect_outliers(samples, method);
    let cleaned = &analysis.cleaned;

    let mean = if cleaned.is_empty() {
        0.0
    } else {
        cleaned.iter().sum::<f64>() / cleaned.len() as f64
    };
    let median = compute_percentile(cleaned, 50.0);
    let std_dev = if cleaned.len() < 2 {
        0.0
    } else {
        let variance = cleaned.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
            / (cleaned.len() - 1) as f64;
        variance.sqrt()
    };

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    SummaryStatistics {
        mean,
        median,
        std_dev,
        raw_mean: samples.iter().sum::<f64>() / samples.len() as f64,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        p50: interpolate(&sorted, 50.0),
        p90: interpolate(&sorted, 90.0),
        p95: interpolate(&sorted, 95.0),
        p99: interpolate(&sorted, 99.0),
        sample_count: samples.len(),
        outlier_count: analysis.outlier_indices.len(),
    }
}
