//! Peer messaging configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Peer messaging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// How long a request waits for its response, in milliseconds
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Peers whose messages are accepted; everyone else is ignored
    #[serde(default)]
    pub trusted: Vec<String>,

    /// Channel buffer size for node commands
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_channel_buffer() -> usize {
    100
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            trusted: Vec::new(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

impl PeerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_trusted(&self, peer: &str) -> bool {
        self.trusted.iter().any(|t| t == peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PeerConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.channel_buffer, 100);
        assert!(!config.is_trusted("anyone"));
    }

    #[test]
    fn test_trusted() {
        let config = PeerConfig {
            trusted: vec!["ranger".to_string()],
            ..Default::default()
        };
        assert!(config.is_trusted("ranger"));
        assert!(!config.is_trusted("stranger"));
    }
}
