//! Configuration file handling for the wizard driver.
//!
//! Settings are stored as pretty JSON. Every field has a default so a partial
//! file (or none at all) is valid; command-line flags override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::{DEFAULT_CART_KEY, is_key_valid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfServeConfig {
    /// Directory holding the persisted cart
    pub state_dir: PathBuf,
    /// Storage key for the cart blob
    pub storage_key: String,
    /// JSON catalog feed
    pub catalog_path: PathBuf,
    pub currency_symbol: String,
}

impl Default for SelfServeConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".selfserve"),
            storage_key: DEFAULT_CART_KEY.to_string(),
            catalog_path: PathBuf::from("catalog.json"),
            currency_symbol: "$".to_string(),
        }
    }
}

impl SelfServeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !is_key_valid(&self.storage_key) {
            anyhow::bail!(
                "Storage key may only contain letters, numbers, '-' and '_' (got {:?})",
                self.storage_key
            );
        }
        if self.currency_symbol.trim().is_empty() {
            anyhow::bail!("Currency symbol must not be empty");
        }
        if self.state_dir.as_os_str().is_empty() {
            anyhow::bail!("State directory must be specified");
        }
        if self.catalog_path.as_os_str().is_empty() {
            anyhow::bail!("Catalog path must be specified");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_valid() {
        let config = SelfServeConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_key, "cart");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("selfserve.json");

        let config = SelfServeConfig {
            currency_symbol: "€".into(),
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = SelfServeConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "storage_key": "quote" }"#).unwrap();

        let loaded = SelfServeConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.storage_key, "quote");
        assert_eq!(loaded.currency_symbol, "$");
    }

    #[test]
    fn test_invalid_key_rejected() {
        let config = SelfServeConfig {
            storage_key: "../cart".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Storage key"));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = SelfServeConfig::load_from_file("/nonexistent/selfserve.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration"));
    }
}
