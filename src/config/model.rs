//! ManagerConfig struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Configuration for a lock manager and the tools built on it.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Seed for the lock token counter. When unset, the wall-clock Unix time
    /// at construction is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_seed: Option<u64>,

    /// Timeout header value used when a replayed create or refresh step does
    /// not give one (default: "Infinite").
    #[serde(default = "default_timeout")]
    pub default_timeout: String,
}

pub(crate) fn default_timeout() -> String {
    "Infinite".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            token_seed: None,
            default_timeout: default_timeout(),
        }
    }
}
