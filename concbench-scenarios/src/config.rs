//! Workload Cost Knobs
//!
//! One place to tune how much work each simulated workload does. Loaded from the
//! `[scenarios]` table of `concbench.toml`; every field has a default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected cost settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioConfigError {
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },

    #[error("fail_threshold ({threshold}) cannot exceed fail_modulus ({modulus})")]
    ThresholdAboveModulus { threshold: u64, modulus: u64 },
}

/// Cost parameters for the simulated workloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Query parameters appended per database unit
    pub param_count: usize,
    /// Minimum records in the database JSON payload
    pub json_records_base: u64,
    /// Mask applied to the extra record count
    pub json_records_mask: u64,

    /// Attempts made by the network workload before giving up
    pub max_attempts: u32,
    /// Attempt fails when `(id + attempt) % fail_modulus < fail_threshold`
    pub fail_modulus: u64,
    /// See `fail_modulus`
    pub fail_threshold: u64,
    /// Mixing rounds spent simulating latency
    pub network_mix_rounds: u32,
    /// Latency cost range
    pub network_latency_modulus: u64,
    /// Mixing rounds spent between attempts
    pub backoff_mix_rounds: u32,

    /// Compute iterations per unit id
    pub compute_scale: u64,

    /// Upper bound (inclusive) of the memory transform's source range
    pub dataset_size: u64,

    /// Pseudo-lines generated per file unit
    pub file_lines: usize,
    /// Width each pseudo-line is padded to
    pub line_len: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            param_count: 50,
            json_records_base: 7,
            json_records_mask: 63,
            max_attempts: 3,
            fail_modulus: 10,
            fail_threshold: 3,
            network_mix_rounds: 200,
            network_latency_modulus: 100_000,
            backoff_mix_rounds: 2_000,
            compute_scale: 100,
            dataset_size: 1_000,
            file_lines: 1_000,
            line_len: 48,
        }
    }
}

impl ScenarioConfig {
    /// Check the settings can drive every workload
    pub fn validate(&self) -> Result<(), ScenarioConfigError> {
        let nonzero = [
            ("max_attempts", u64::from(self.max_attempts)),
            ("fail_modulus", self.fail_modulus),
            ("network_latency_modulus", self.network_latency_modulus),
            ("line_len", self.line_len as u64),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, value)| *value == 0) {
            return Err(ScenarioConfigError::Zero { field: *field });
        }

        if self.fail_threshold > self.fail_modulus {
            return Err(ScenarioConfigError::ThresholdAboveModulus {
                threshold: self.fail_threshold,
                modulus: self.fail_modulus,
            });
        }
        Ok(())
    }
}
