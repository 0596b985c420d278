//! Policy store configuration
//!
//! ```toml
//! cache_size       = 1024
//! caching_disabled = false
//! storage_prefix   = "policy/"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of parsed policies kept in memory
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Default storage key prefix for policy records
pub const DEFAULT_STORAGE_PREFIX: &str = "policy/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Capacity of the policy cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Disable the policy cache entirely; every lookup reads storage
    #[serde(default)]
    pub caching_disabled: bool,

    /// Storage key prefix, normally ending in `/`
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            cache_size: default_cache_size(),
            caching_disabled: false,
            storage_prefix: default_storage_prefix(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_storage_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.cache_size, 1024);
        assert!(!config.caching_disabled);
        assert_eq!(config.storage_prefix, "policy/");

        assert_eq!(StoreConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_override() {
        let config = StoreConfig::from_toml_str("caching_disabled = true").unwrap();
        assert!(config.caching_disabled);
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);
    }

    #[test]
    fn test_full_config() {
        let config = StoreConfig::from_toml_str(
            r#"
            cache_size = 16
            storage_prefix = "sys/policy/acl/"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_size, 16);
        assert_eq!(config.storage_prefix, "sys/policy/acl/");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            StoreConfig::from_toml_str("cache = 5"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "cache_size = 8\n").unwrap();

        assert_eq!(StoreConfig::from_file(&path).unwrap().cache_size, 8);
        assert!(matches!(
            StoreConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
