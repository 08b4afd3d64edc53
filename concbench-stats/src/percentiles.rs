//! Percentiles
//!
//! Always taken over every sample: slow invocations are the tail, not noise.

/// Linearly interpolated percentile (`percentile` in 0..=100)
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    match samples {
        [] => 0.0,
        [only] => *only,
        _ => {
            let mut sorted = samples.to_vec();
            sorted.sort_by(f64::total_cmp);
            interpolate(&sorted, percentile)
        }
    }
}

/// Percentile of already sorted samples
pub(crate) fn interpolate(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(last);
    let fraction = rank - lower as f64;

    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}
