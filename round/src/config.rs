//! Round engine configuration.
//!
//! Thresholds are expressed as a percentage of the active miner count and
//! rounded up, so 67% of 3 miners is 3 and 67% of 4 miners is 3.

use serde::{Deserialize, Serialize};

/// Configuration for round bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Upper bound on a round's timeout count.  Zero leaves it uncapped.
    /// Default: 0.
    pub timeout_cap: u32,

    /// Share of miners whose VRF shares are needed to derive the seed.
    /// Default: 67.
    pub vrf_threshold_pct: u32,

    /// Share of miners whose verification tickets notarize a block.
    /// Default: 67.
    pub notarization_threshold_pct: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            timeout_cap: 0,
            vrf_threshold_pct: 67,
            notarization_threshold_pct: 67,
        }
    }
}

impl RoundConfig {
    /// Number of distinct VRF shares needed out of `miners`.
    pub fn vrf_threshold(&self, miners: usize) -> usize {
        threshold(miners, self.vrf_threshold_pct)
    }

    /// Number of verification tickets needed out of `miners`.
    pub fn notarization_threshold(&self, miners: usize) -> usize {
        threshold(miners, self.notarization_threshold_pct)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vrf_threshold_pct == 0 || self.vrf_threshold_pct > 100 {
            return Err(ConfigError::InvalidVrfThreshold(self.vrf_threshold_pct));
        }
        if self.notarization_threshold_pct == 0 || self.notarization_threshold_pct > 100 {
            return Err(ConfigError::InvalidNotarizationThreshold(
                self.notarization_threshold_pct,
            ));
        }
        Ok(())
    }
}

fn threshold(miners: usize, pct: u32) -> usize {
    let scaled = miners.saturating_mul(pct as usize);
    scaled.div_ceil(100).max(1)
}

/// Errors in round configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("vrf_threshold_pct must be in [1, 100], got {0}")]
    InvalidVrfThreshold(u32),
    #[error("notarization_threshold_pct must be in [1, 100], got {0}")]
    InvalidNotarizationThreshold(u32),
}
