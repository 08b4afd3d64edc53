//! Simulated allocation-heavy transform

const MULTIPLIER: i64 = 6_364_136_223_846_793_005;

/// Lazily mapped and filtered transform over `0..=size`
pub fn transform_dataset(size: u64) -> Vec<i64> {
    (0..=size as i64)
        .map(|v| v.wrapping_mul(v).wrapping_mul(MULTIPLIER))
        .filter(|v| v % 3 == 0)
        .map(|v| v.wrapping_mul(2).wrapping_add(v.rotate_left(32)))
        .collect()
}
