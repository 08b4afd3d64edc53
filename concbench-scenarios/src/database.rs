//! Simulated database query
//!
//! Build a parameterised query string, wrap it in a JSON payload and "validate"
//! the payload by hashing its tokens. No real I/O.

use crate::config::ScenarioConfig;
use crate::rng::{DeterministicRng, fnv1a64, fnv1a64_str};
use std::fmt::Write;

const QUERY_SALT: u64 = 0x1234_5678_9abc_def0;
const RECORDS_SALT: u64 = 0x0fed_cba9_8765_4321;
const PREVIEW_LEN: usize = 100;

/// Query string with `param_count` pseudo-random parameters
pub fn build_query(id: u64, config: &ScenarioConfig) -> String {
    let mut query = String::with_capacity(16 + config.param_count * 16);
    let _ = write!(query, "id={id}");

    let mut seed = DeterministicRng::seed(id, QUERY_SALT);
    for param in 0..config.param_count {
        seed = DeterministicRng::mix64(seed.wrapping_add(param as u64));
        let value = (seed >> 33) & 1023;
        let _ = write!(query, "&param{param}={value}");
    }
    query
}

/// JSON payload quoting the start of the query
pub fn build_json(id: u64, query: &str, config: &ScenarioConfig) -> String {
    let extra = DeterministicRng::mix64(DeterministicRng::seed(id, RECORDS_SALT));
    let records = config.json_records_base + (extra & config.json_records_mask);
    let preview: String = query.chars().take(PREVIEW_LEN).collect();

    format!("{{\n  \"id\": {id},\n  \"data\": \"{preview}...\",\n  \"records\": [{records}]\n}}")
}

/// Checksum over the whitespace-separated tokens of the payload
pub fn validate(json: &str) -> String {
    let checksum = json
        .split([' ', '\n', '\t'])
        .filter(|token| !token.is_empty())
        .fold(0, |acc, token| fnv1a64(fnv1a64_str(token), acc));
    format!("validated-{checksum}")
}

/// Run the whole query simulation for one unit
pub fn simulate_query(id: u64, config: &ScenarioConfig) -> String {
    let query = build_query(id, config);
    let json = build_json(id, &query, config);
    validate(&json)
}
