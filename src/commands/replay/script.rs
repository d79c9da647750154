//! Replay script model.
//!
//! ```yaml
//! start: 2024-01-01T00:00:00Z
//! steps:
//!   - op: create
//!     root: /docs
//!     timeout: Second-60
//!     as: docs
//!   - at: 10
//!     op: confirm
//!     names: [/docs/a.txt]
//!     tokens: [docs]
//!     as: put
//!   - at: 11
//!     op: release
//!     claim: put
//!   - at: 61
//!     op: lookup
//!     name: /docs
//!     expect: no_such_lock
//! ```

use chrono::{DateTime, Utc};
use davlock::error::{DavLockError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A scripted lock session.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Instant that step offsets are measured from (default: the Unix epoch).
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    pub steps: Vec<Step>,
}

/// One timed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Seconds after `start` at which the step runs. Fractions are allowed.
    #[serde(default)]
    pub at: f64,

    /// Outcome the step must produce; a mismatch fails the replay.
    #[serde(default)]
    pub expect: Option<Outcome>,

    #[serde(flatten)]
    pub op: Operation,
}

/// Lock manager operation to perform. Token and claim fields name aliases
/// bound by earlier `as:` fields; unbound token names are used verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Create {
        root: String,
        #[serde(default)]
        timeout: Option<String>,
        #[serde(default)]
        zero_depth: bool,
        #[serde(default)]
        owner: Option<String>,
        #[serde(default, rename = "as")]
        bind: Option<String>,
    },
    Refresh {
        token: String,
        #[serde(default)]
        timeout: Option<String>,
    },
    Unlock {
        token: String,
    },
    Confirm {
        #[serde(default)]
        names: Vec<String>,
        #[serde(default)]
        tokens: Vec<String>,
        #[serde(default, rename = "as")]
        bind: Option<String>,
    },
    Release {
        claim: String,
    },
    Lookup {
        name: String,
    },
    Delete {
        name: String,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Refresh { .. } => "refresh",
            Operation::Unlock { .. } => "unlock",
            Operation::Confirm { .. } => "confirm",
            Operation::Release { .. } => "release",
            Operation::Lookup { .. } => "lookup",
            Operation::Delete { .. } => "delete",
        }
    }
}

/// Classified result of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    ConfirmationFailed,
    Forbidden,
    Locked,
    NoSuchLock,
    InvalidTimeout,
    Internal,
}

impl Outcome {
    pub fn from_error(err: &DavLockError) -> Self {
        match err {
            DavLockError::ConfirmationFailed => Outcome::ConfirmationFailed,
            DavLockError::Forbidden => Outcome::Forbidden,
            DavLockError::Locked => Outcome::Locked,
            DavLockError::NoSuchLock => Outcome::NoSuchLock,
            DavLockError::InvalidTimeout(_) => Outcome::InvalidTimeout,
            _ => Outcome::Internal,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Ok => "ok",
            Outcome::ConfirmationFailed => "confirmation_failed",
            Outcome::Forbidden => "forbidden",
            Outcome::Locked => "locked",
            Outcome::NoSuchLock => "no_such_lock",
            Outcome::InvalidTimeout => "invalid_timeout",
            Outcome::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

impl Script {
    /// Load a script from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DavLockError::UserError(format!(
                "failed to read replay script '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a script from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Script = serde_yaml::from_str(yaml).map_err(|e| {
            DavLockError::UserError(format!("failed to parse replay script: {}", e))
        })?;

        for (i, step) in script.steps.iter().enumerate() {
            if !step.at.is_finite() || step.at < 0.0 {
                return Err(DavLockError::UserError(format!(
                    "step {}: 'at' must be a non-negative number of seconds (found {})",
                    i + 1,
                    step.at
                )));
            }
        }
        Ok(script)
    }
}
