//! Public lock data types.

use crate::timeout::LockTimeout;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lock's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDetails {
    /// Root resource name being locked. For a zero-depth lock, the root is the
    /// only resource being locked.
    pub root: String,

    /// Lock timeout.
    pub duration: LockTimeout,

    /// Verbatim `<owner>` XML from the LOCK request.
    #[serde(default)]
    pub owner_xml: String,

    /// Whether the lock has zero depth. Otherwise its depth is infinite.
    #[serde(default)]
    pub zero_depth: bool,
}

impl LockDetails {
    /// Details for a new lock at `root`.
    pub fn new(root: impl Into<String>, duration: LockTimeout, zero_depth: bool) -> Self {
        Self {
            root: root.into(),
            duration,
            owner_xml: String::new(),
            zero_depth,
        }
    }

    /// Attach the owner XML.
    pub fn with_owner(mut self, owner_xml: impl Into<String>) -> Self {
        self.owner_xml = owner_xml.into();
        self
    }

    /// Placeholder details for a node that only anchors descendant locks.
    pub(super) fn anchor(root: &str) -> Self {
        Self::new(root, LockTimeout::Infinite, false)
    }
}

/// A claim presented by the caller, matched against existing locks in
/// [`LockManager::confirm`](super::LockManager::confirm).
///
/// Only `token` takes part in matching. `not` and `etag` are carried for the
/// protocol's `If` header but are not evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub not: bool,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub etag: String,
}

impl Condition {
    /// A condition claiming the lock with the given token.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }
}

/// Result of lock discovery by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockInfo {
    /// Token of the covering lock.
    pub token: String,

    /// When the lock expires, or `None` if it never does.
    pub expiry: Option<DateTime<Utc>>,

    /// The covering lock's metadata.
    pub details: LockDetails,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (token: {}, depth: {}, timeout: {}",
            self.details.root,
            self.token,
            if self.details.zero_depth { "0" } else { "infinity" },
            self.details.duration
        )?;
        if let Some(expiry) = self.expiry {
            write!(f, ", expires: {}", expiry.to_rfc3339())?;
        }
        write!(f, ")")
    }
}
