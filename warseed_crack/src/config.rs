// Tunable search parameters.
//
// `CrackConfig` controls how much of the candidate space a scan covers and
// how the work is split across threads. It never touches the generator's
// constants, which are fixed in `warseed_lcg`. Loaded from JSON; every field
// has a default so a config file only needs the keys it overrides.
//
// See also: `cracker.rs`, which reads every field here.

use crate::error::CrackError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrackConfig {
    /// How many low-bit candidates to test, starting from 0. `None` scans the
    /// whole space, which for a 16-bit first observation is 2^32 candidates.
    pub attempts: Option<u64>,
    /// Worker threads for the scan. 0 lets rayon pick (one per core).
    /// 1 keeps the scan on the calling thread.
    pub workers: usize,
    /// Candidates per work unit. Results are merged in chunk order, so this
    /// affects scheduling granularity only, never the reported result.
    pub chunk_size: u64,
    /// Cap on concrete candidate states kept in a report. Hits beyond the
    /// cap are still counted.
    pub max_recorded_candidates: usize,
}

impl Default for CrackConfig {
    fn default() -> Self {
        Self {
            attempts: Some(1_000_000),
            workers: 1,
            chunk_size: 1 << 16,
            max_recorded_candidates: 1024,
        }
    }
}

impl CrackConfig {
    /// A config that scans the entire candidate space.
    pub fn full_scan() -> Self {
        Self {
            attempts: None,
            ..Self::default()
        }
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CrackError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CrackError> {
        let config: CrackConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CrackError> {
        if self.chunk_size == 0 {
            return Err(CrackError::InvalidConfig("chunk_size must be positive".into()));
        }
        Ok(())
    }
}
