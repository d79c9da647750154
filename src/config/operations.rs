//! Config loading and validation.

use super::model::ManagerConfig;
use crate::error::{DavLockError, Result};
use crate::timeout::{LockTimeout, parse_timeout};
use std::path::Path;

impl ManagerConfig {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(ManagerConfig)` - Successfully loaded and validated config
    /// * `Err(DavLockError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DavLockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ManagerConfig = serde_yaml::from_str(yaml)
            .map_err(|e| DavLockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            DavLockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// - `default_timeout` must be a valid Timeout header value
    pub fn validate(&self) -> Result<()> {
        parse_timeout(&self.default_timeout).map_err(|e| {
            DavLockError::UserError(format!("config validation failed: default_timeout: {}", e))
        })?;
        Ok(())
    }

    /// The parsed `default_timeout`.
    pub fn default_lock_timeout(&self) -> Result<LockTimeout> {
        parse_timeout(&self.default_timeout)
    }
}
