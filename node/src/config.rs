//! Configuration for node-to-node messaging.

use {
    serde::{Deserialize, Serialize},
    std::{net::SocketAddr, time::Duration},
};

/// Timeout class applied to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageClass {
    /// Votes, shares and tickets.
    Small,
    /// Blocks.
    Large,
}

/// Settings for the N2N layer.
///
/// These are read-only once the node is running; an outer config loader
/// deserializes them and hands them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct N2NConfig {
    /// Local address for the inbound listener.
    /// Default: `0.0.0.0:7171`
    pub bind_addr: SocketAddr,

    /// Send timeout for small messages (ms).
    pub small_message_timeout_ms: u64,

    /// Send timeout for large messages (ms).
    pub large_message_timeout_ms: u64,

    /// Payload size in bytes above which a message counts as large for
    /// send-time statistics.
    pub large_message_threshold: usize,

    /// Maximum size of a single encoded frame in bytes.
    pub max_message_size: usize,

    /// Size of the inbound frame channel buffer.
    pub channel_buffer_size: usize,
}

impl Default for N2NConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7171)),
            small_message_timeout_ms: 1_000,
            large_message_timeout_ms: 3_000,
            large_message_threshold: 10 * 1024,
            max_message_size: 1_048_576, // 1 MB
            channel_buffer_size: 10_000,
        }
    }
}

impl N2NConfig {
    /// Create a config suitable for local testing with shorter timeouts.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            small_message_timeout_ms: 200,
            large_message_timeout_ms: 500,
            large_message_threshold: 10 * 1024,
            max_message_size: 1_048_576,
            channel_buffer_size: 1_000,
        }
    }

    /// Send timeout for the given message class.
    pub fn timeout(&self, class: MessageClass) -> Duration {
        match class {
            MessageClass::Small => Duration::from_millis(self.small_message_timeout_ms),
            MessageClass::Large => Duration::from_millis(self.large_message_timeout_ms),
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_message_timeout_ms == 0 || self.large_message_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.small_message_timeout_ms > self.large_message_timeout_ms {
            return Err(ConfigError::SmallTimeoutExceedsLarge {
                small: self.small_message_timeout_ms,
                large: self.large_message_timeout_ms,
            });
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::InvalidMaxMessageSize);
        }
        Ok(())
    }
}

/// Errors in N2N configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("message timeouts must be > 0")]
    ZeroTimeout,
    #[error("small message timeout {small}ms exceeds large message timeout {large}ms")]
    SmallTimeoutExceedsLarge { small: u64, large: u64 },
    #[error("max_message_size must be > 0")]
    InvalidMaxMessageSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = N2NConfig::default();
        assert_eq!(config.small_message_timeout_ms, 1000);
        assert_eq!(config.large_message_timeout_ms, 3000);
        assert_eq!(config.large_message_threshold, 10 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_by_class() {
        let config = N2NConfig::default();
        assert_eq!(config.timeout(MessageClass::Small), Duration::from_secs(1));
        assert_eq!(config.timeout(MessageClass::Large), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_timeouts() {
        let mut config = N2NConfig::default();
        config.small_message_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));

        let mut config = N2NConfig::default();
        config.small_message_timeout_ms = 5_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SmallTimeoutExceedsLarge { .. })
        ));
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "bind_addr": "127.0.0.1:9000",
            "small_message_timeout_ms": 500,
            "large_message_timeout_ms": 2500,
            "large_message_threshold": 4096,
            "max_message_size": 65536,
            "channel_buffer_size": 64
        }"#;
        let config: N2NConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.large_message_threshold, 4096);
        assert!(config.validate().is_ok());
    }
}
