//! Simulated file processing
//!
//! Generates padded pseudo-lines in memory, then counts lines per prefix.

use crate::config::ScenarioConfig;
use crate::rng::DeterministicRng;
use std::collections::BTreeMap;
use std::fmt::Write;

const FILE_SALT: u64 = 0x1111_2222_3333_4444;

/// In-memory file contents for unit `id`
pub fn generate_contents(id: u64, config: &ScenarioConfig) -> String {
    let mut contents = String::with_capacity(config.file_lines * (config.line_len + 1));
    let mut seed = DeterministicRng::seed(id, FILE_SALT);

    for line in 1..=config.file_lines {
        seed = DeterministicRng::mix64(seed.wrapping_add(line as u64));
        let suffix = (seed >> 40) & 1023;
        let _ = write!(contents, "line-{id}-{line}-data-{suffix}");

        let pad = config
            .line_len
            .saturating_sub(contents.len() % (config.line_len + 1));
        contents.extend(std::iter::repeat_n('x', pad));
        contents.push('\n');
    }
    contents
}

/// Line counts grouped by the text before the first `-`
pub fn process(id: u64, config: &ScenarioConfig) -> BTreeMap<String, usize> {
    let contents = generate_contents(id, config);
    let mut counts = BTreeMap::new();
    for line in contents.lines() {
        let prefix = line.split_once('-').map_or(line, |(prefix, _)| prefix);
        *counts.entry(prefix.to_string()).or_insert(0) += 1;
    }
    counts
}
