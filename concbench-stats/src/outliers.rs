//! Outlier Detection
//!
//! Outliers are flagged with Tukey fences over the interquartile range. They are
//! dropped only from the central-tendency figures (mean, median, std-dev); the
//! extremes and percentiles keep them.

use crate::percentiles::compute_percentile;
use serde::{Deserialize, Serialize};

/// How outliers are detected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Samples outside `[Q1 - k*IQR, Q3 + k*IQR]`
    Iqr {
        /// Fence multiplier
        k: f64,
    },
    /// Keep every sample
    None,
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::Iqr { k: 1.5 }
    }
}

/// Samples split into kept values and flagged outliers
#[derive(Debug, Clone)]
pub struct OutlierAnalysis {
    /// Samples inside the fences
    pub cleaned: Vec<f64>,
    /// Indices of flagged samples
    pub outlier_indices: Vec<usize>,
    /// Flagged below the lower fence
    pub low: usize,
    /// Flagged above the upper fence
    pub high: usize,
    /// Lower fence
    pub lower_bound: f64,
    /// Upper fence
    pub upper_bound: f64,
}

impl OutlierAnalysis {
    /// Share of samples flagged, in percent
    pub fn outlier_percentage(&self) -> f64 {
        let total = self.cleaned.len() + self.outlier_indices.len();
        if total == 0 {
            0.0
        } else {
            self.outlier_indices.len() as f64 / total as f64 * 100.0
        }
    }
}

/// Flag outliers in `samples`
pub fn detect_outliers(samples: &[f64], method: OutlierMethod) -> OutlierAnalysis {
    let (lower_bound, upper_bound) = match method {
        OutlierMethod::None => (f64::NEG_INFINITY, f64::INFINITY),
        OutlierMethod::Iqr { .. } if samples.is_empty() => (0.0, 0.0),
        OutlierMethod::Iqr { k } => {
            let q1 = compute_percentile(samples, 25.0);
            let q3 = compute_percentile(samples, 75.0);
            let iqr = q3 - q1;
            (q1 - k * iqr, q3 + k * iqr)
        }
    };

    let mut analysis = OutlierAnalysis {
        cleaned: Vec::with_capacity(samples.len()),
        outlier_indices: Vec::new(),
        low: 0,
        high: 0,
        lower_bound,
        upper_bound,
    };

    for (index, &sample) in samples.iter().enumerate() {
        if sample < lower_bound {
            analysis.low += 1;
            analysis.outlier_indices.push(index);
        } else if sample > upper_bound {
            analysis.high += 1;
            analysis.outlier_indices.push(index);
        } else {
            analysis.cleaned.push(sample);
        }
    }
    analysis
}
