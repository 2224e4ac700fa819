use crate::error::{BlockchainError, Result};
use crate::wallet::PrivateKey;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Protocol version string sent in every handshake
pub const DEFAULT_VERSION: &str = "gossip-chain-0.1";
/// Listen address when none is configured
pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:3000";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";

/// Settings for one node process. Every field has a default so a TOML
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub version: String,
    /// Address we listen on and advertise to peers
    pub listen_addr: String,
    /// Dialed once at startup
    pub bootstrap_nodes: Vec<String>,
    /// Hex-encoded 32-byte seed; presence makes this node a validator
    pub private_key: Option<String>,
    /// Validator tick interval
    pub block_time_ms: u64,
    /// Seal blocks instead of only clearing the pool
    pub block_production: bool,
    pub dial_timeout_ms: u64,
    pub call_timeout_ms: u64,
    /// Total tries per outbound call, first one included
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Sled directory; blocks stay in memory when unset
    pub store_path: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            version: DEFAULT_VERSION.to_string(),
            listen_addr: DEFAULT_NODE_ADDR.to_string(),
            bootstrap_nodes: Vec::new(),
            private_key: None,
            block_time_ms: 5_000,
            block_production: false,
            dial_timeout_ms: 3_000,
            call_timeout_ms: 5_000,
            retry_attempts: 3,
            retry_backoff_ms: 200,
            store_path: None,
        }
    }
}

impl NodeConfig {
    /// Defaults with the given listen address
    pub fn new(listen_addr: &str) -> NodeConfig {
        NodeConfig {
            listen_addr: listen_addr.to_string(),
            ..Default::default()
        }
    }

    /// Parse TOML; unknown keys are rejected
    pub fn from_toml_str(s: &str) -> Result<NodeConfig> {
        let config: NodeConfig = toml::from_str(s)?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<NodeConfig> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// `NODE_ADDRESS` replaces the listen address when set
    pub fn with_env_overrides(mut self) -> NodeConfig {
        if let Ok(addr) = env::var(NODE_ADDRESS_KEY) {
            if !addr.trim().is_empty() {
                self.listen_addr = addr;
            }
        }
        self
    }

    /// Reject settings a node cannot start with. Checked by `Node::new`.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(BlockchainError::Configuration(
                "listen_addr must not be empty".to_string(),
            ));
        }
        if self.block_time_ms == 0 {
            return Err(BlockchainError::Configuration(
                "block_time_ms must be positive".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(BlockchainError::Configuration(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.dial_timeout_ms == 0 || self.call_timeout_ms == 0 {
            return Err(BlockchainError::Configuration(
                "network timeouts must be positive".to_string(),
            ));
        }
        self.signing_key()?;
        Ok(())
    }

    /// Parse the configured seed, if any
    pub fn signing_key(&self) -> Result<Option<PrivateKey>> {
        self.private_key
            .as_deref()
            .map(PrivateKey::from_hex)
            .transpose()
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_time(), Duration::from_secs(5));
        assert!(config.signing_key().unwrap().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = NodeConfig::from_toml_str(
            r#"
            listen_addr = "127.0.0.1:4000"
            bootstrap_nodes = ["127.0.0.1:3000", "127.0.0.1:3001"]
            block_time_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:4000");
        assert_eq!(config.bootstrap_nodes.len(), 2);
        assert_eq!(config.block_time_ms, 1000);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = NodeConfig::from_toml_str("listen = \"x\"");
        assert!(matches!(result, Err(BlockchainError::Configuration(_))));
    }

    #[test]
    fn test_malformed_seed_rejected() {
        let config = NodeConfig {
            private_key: Some("abcd".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BlockchainError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_block_time_rejected() {
        let config = NodeConfig {
            block_time_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
