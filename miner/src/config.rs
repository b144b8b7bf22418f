//! Miner configuration.

use {
    serde::{Deserialize, Serialize},
    std::time::Duration,
    zcn_node::N2NConfig,
    zcn_round::RoundConfig,
};

/// Configuration for a miner process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Round engine thresholds and timeout cap.
    pub round: RoundConfig,

    /// Node-to-node transport settings.
    pub n2n: N2NConfig,

    /// Deadline for finalizing one round before the worker moves on.
    /// Default: 5000.
    pub finalize_timeout_ms: u64,

    /// Rounds kept behind the latest finalized round.
    /// Default: 10.
    pub round_window: i64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            round: RoundConfig::default(),
            n2n: N2NConfig::default(),
            finalize_timeout_ms: 5_000,
            round_window: 10,
        }
    }
}

impl MinerConfig {
    /// Local configuration with short timeouts for tests.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            round: RoundConfig::default(),
            n2n: N2NConfig::dev_default(),
            finalize_timeout_ms: 500,
            round_window: 10,
        }
    }

    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.round.validate()?;
        self.n2n.validate()?;
        if self.finalize_timeout_ms == 0 {
            return Err(ConfigError::ZeroFinalizeTimeout);
        }
        if self.round_window < 1 {
            return Err(ConfigError::InvalidRoundWindow(self.round_window));
        }
        Ok(())
    }
}

/// Errors in miner configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Round(#[from] zcn_round::config::ConfigError),
    #[error(transparent)]
    N2N(#[from] zcn_node::config::ConfigError),
    #[error("finalize_timeout_ms must be > 0")]
    ZeroFinalizeTimeout,
    #[error("round_window must be >= 1, got {0}")]
    InvalidRoundWindow(i64),
}
