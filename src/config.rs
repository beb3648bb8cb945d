//! Ledger configuration
//!
//! Runtime configuration for the settlement core. Supports loading from
//! environment variables with the ARENA_ prefix.

use serde::{Deserialize, Serialize};
use std::env;

use crate::storage::StorageConfig;

/// Settlement core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum attempts for a contended transaction before giving up
    #[serde(default = "default_max_txn_attempts")]
    pub max_txn_attempts: u32,
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_max_txn_attempts() -> u32 {
    5
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_txn_attempts: 5,
            storage: StorageConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - ARENA_MAX_TXN_ATTEMPTS: Maximum transaction retry attempts
    /// - ARENA_DATA_DIR: Data directory for the persistent backend
    /// - ARENA_FLUSH_ON_COMMIT: Flush to disk after every commit (true/false)
    /// - ARENA_CACHE_BYTES: Storage page-cache capacity in bytes
    pub fn from_env() -> Self {
        let defaults = StorageConfig::default();

        Self {
            max_txn_attempts: env::var("ARENA_MAX_TXN_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            storage: StorageConfig {
                data_dir: env::var("ARENA_DATA_DIR").unwrap_or(defaults.data_dir),
                flush_on_commit: env::var("ARENA_FLUSH_ON_COMMIT")
                    .map(|s| s.to_lowercase() == "true" || s == "1")
                    .unwrap_or(defaults.flush_on_commit),
                cache_bytes: env::var("ARENA_CACHE_BYTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.cache_bytes),
            },
        }
    }

    /// Create a development configuration
    pub fn development() -> Self {
        Self {
            max_txn_attempts: 3,
            storage: StorageConfig::development(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_txn_attempts, 5);
        assert!(config.storage.flush_on_commit);
    }

    #[test]
    fn test_config_development() {
        let config = LedgerConfig::development();
        assert_eq!(config.max_txn_attempts, 3);
        assert!(!config.storage.flush_on_commit);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LedgerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_txn_attempts, 5);
        assert_eq!(config.storage.cache_bytes, 64 * 1024 * 1024);
    }
}
