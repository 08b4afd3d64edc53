//! Simulated network call with retry
//!
//! Attempts fail on a fixed schedule derived from the unit id. Retrying belongs to
//! the workload itself: an exhausted budget yields a `Failed-…` value rather than
//! an error, so the strategies never retry anything.

use crate::config::ScenarioConfig;
use crate::rng::DeterministicRng;
use tracing::trace;

/// Whether `attempt` of operation `id` is scheduled to fail
pub fn should_fail(id: u64, attempt: u32, config: &ScenarioConfig) -> bool {
    (id + u64::from(attempt)) % config.fail_modulus < config.fail_threshold
}

/// CPU cost standing in for round-trip latency
pub fn latency_cost(id: u64, attempt: u32, config: &ScenarioConfig) -> u64 {
    let mut x = DeterministicRng::seed(id, u64::from(attempt));
    for round in 0..config.network_mix_rounds {
        x = DeterministicRng::mix64(x.wrapping_add(u64::from(round)));
    }
    (x >> 11) % config.network_latency_modulus
}

/// CPU cost standing in for the wait before attempt `attempt`
pub fn backoff_cost(attempt: u32, config: &ScenarioConfig) -> u64 {
    let mut x = 1u64.checked_shl(attempt).unwrap_or(0);
    for round in 0..config.backoff_mix_rounds {
        x = DeterministicRng::mix64(x.wrapping_add(u64::from(round)));
    }
    x
}

/// Call with up to `max_attempts` tries
pub fn call_with_retry(id: u64, config: &ScenarioConfig) -> String {
    let attempts = config.max_attempts;
    for attempt in 0..attempts {
        if !should_fail(id, attempt, config) {
            let latency = latency_cost(id, attempt, config);
            return format!("Success-{id}-attempt-{attempt}-latency-{latency}");
        }
        if attempt + 1 < attempts {
            std::hint::black_box(backoff_cost(attempt + 1, config));
        }
    }

    trace!(id, attempts, "network retries exhausted");
    format!("Failed-{id}-after-{attempts}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_schedule() {
        let config = ScenarioConfig::default();
        let failing: Vec<u64> = (0..10).filter(|id| should_fail(*id, 0, &config)).collect();
        assert_eq!(failing, vec![0, 1, 2]);
    }

    #[test]
    fn test_retry_outcomes() {
        let config = ScenarioConfig::default();
        assert!(call_with_retry(5, &config).starts_with("Success-5-attempt-0-"));
        // attempts 0 and 1 fail, the third goes through
        assert!(call_with_retry(1, &config).starts_with("Success-1-attempt-2-"));
        // every attempt fails
        assert_eq!(call_with_retry(10, &config), "Failed-10-after-3");
    }

    #[test]
    fn test_latency_in_range() {
        let config = ScenarioConfig::default();
        for id in 0..50 {
            assert!(latency_cost(id, 0, &config) < config.network_latency_modulus);
        }
    }
}
