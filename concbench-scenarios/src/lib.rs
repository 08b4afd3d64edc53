#![warn(missing_docs)]
//! ConcBench Scenarios - Simulated Workloads
//!
//! Deterministic, CPU-side stand-ins for common service work. Nothing here
//! touches the network or the file system:
//! - Database: build a query, wrap it in JSON, hash-validate it
//! - Network: a call with a fixed failure schedule and retry budget
//! - Compute: FNV + square-root accumulation
//! - Memory: lazily mapped/filtered transform of a numeric range
//! - File I/O: padded pseudo-lines generated in memory, counted by prefix

pub mod compute;
mod config;
pub mod database;
pub mod file;
pub mod memory;
pub mod network;
mod rng;
mod workload;

pub use config::{ScenarioConfig, ScenarioConfigError};
pub use rng::{DeterministicRng, fnv1a64, fnv1a64_str};
pub use workload::ScenarioWorkload;
