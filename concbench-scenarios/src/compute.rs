//! Simulated CPU-bound calculation

use crate::rng::fnv1a64;

/// Hash-and-root accumulation over `0..=iterations`
pub fn heavy_calculation(iterations: u64) -> i64 {
    (0..=iterations).fold(0i64, |acc, i| {
        let hashed = fnv1a64(i, acc as u64) as i64;
        hashed.wrapping_add((i as f64).sqrt() as i64)
    })
}
