//! Bootstrap Confidence Interval
//!
//! Percentile bootstrap for the mean invocation time, reported as the `±` error
//! next to each score. Resampling runs on rayon's global pool and only after the
//! trial's own scope has been released.

use crate::percentiles::interpolate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest sample count worth resampling
pub const MIN_BOOTSTRAP_SAMPLES: usize = 3;

/// Resampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Number of resamples
    pub resamples: usize,
    /// Confidence level in (0, 1)
    pub confidence_level: f64,
    /// Seed for reproducible intervals
    pub seed: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            resamples: 10_000,
            confidence_level: 0.999,
            seed: 0x5eed,
        }
    }
}

/// Interval around the sample mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Sample mean
    pub mean: f64,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Confidence level the bounds were computed for
    pub level: f64,
}

impl ConfidenceInterval {
    /// Half-width of the interval, reported as the `±` error
    pub fn margin(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

/// Rejected interval input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntervalError {
    #[error("need at least {min} samples, got {got}")]
    NotEnoughSamples { got: usize, min: usize },

    #[error("confidence level {0} must lie strictly between 0 and 1")]
    InvalidConfidenceLevel(f64),

    #[error("resample count must be at least 1")]
    NoResamples,
}

/// Percentile-bootstrap interval for the mean of `samples`
pub fn compute_interval(
    samples: &[f64],
    config: &IntervalConfig,
) -> Result<ConfidenceInterval, IntervalError> {
    if samples.len() < MIN_BOOTSTRAP_SAMPLES {
        return Err(IntervalError::NotEnoughSamples {
            got: samples.len(),
            min: MIN_BOOTSTRAP_SAMPLES,
        });
    }
    if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
        return Err(IntervalError::InvalidConfidenceLevel(config.confidence_level));
    }
    if config.resamples == 0 {
        return Err(IntervalError::NoResamples);
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let mut means: Vec<f64> = (0..config.resamples)
        .into_par_iter()
        .map(|index| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
            let total: f64 = (0..samples.len())
                .map(|_| samples[rng.gen_range(0..samples.len())])
                .sum();
            total / samples.len() as f64
        })
        .collect();
    means.sort_by(f64::total_cmp);

    let tail = (1.0 - config.confidence_level) / 2.0 * 100.0;
    Ok(ConfidenceInterval {
        mean,
        lower: interpolate(&means, tail),
        upper: interpolate(&means, 100.0 - tail),
        level: config.confidence_level,
    })
}
