//! Lock timeouts and the `Timeout` request header.
//!
//! Grammar: `"Infinite" | "Second-" 1*DIGIT`, with optional comma-separated
//! alternatives of which only the first is considered. An empty header means
//! infinite.

use crate::error::{DavLockError, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static SECONDS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Second-([0-9]+)$").expect("Invalid timeout regex"));

/// Largest `Second-N` value accepted in a Timeout header.
pub const MAX_TIMEOUT_SECONDS: u32 = u32::MAX;

/// How long a lock lives before it expires.
///
/// Finite timeouts are whole, non-negative seconds, matching what a
/// `Second-N` header can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LockTimeout {
    /// The lock never expires.
    Infinite,
    /// The lock expires this many seconds after it was created or last
    /// refreshed.
    Finite(u32),
}

impl LockTimeout {
    /// A finite timeout of `secs` seconds.
    pub fn seconds(secs: u32) -> Self {
        LockTimeout::Finite(secs)
    }

    /// Convert a signed duration. Negative durations mean infinite; anything
    /// longer than [`MAX_TIMEOUT_SECONDS`] is clamped to it.
    pub fn from_duration(duration: Duration) -> Self {
        let secs = duration.num_seconds();
        if secs < 0 {
            return LockTimeout::Infinite;
        }
        LockTimeout::Finite(u32::try_from(secs).unwrap_or(MAX_TIMEOUT_SECONDS))
    }

    /// The finite duration, or `None` if infinite.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            LockTimeout::Infinite => None,
            LockTimeout::Finite(secs) => Some(Duration::seconds(i64::from(*secs))),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, LockTimeout::Infinite)
    }

    /// Absolute expiry for a lock (re)started at `now`, or `None` if infinite.
    ///
    /// Saturates at the latest representable instant.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration()
            .map(|d| now.checked_add_signed(d).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}

impl fmt::Display for LockTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockTimeout::Infinite => write!(f, "Infinite"),
            LockTimeout::Finite(secs) => write!(f, "Second-{}", secs),
        }
    }
}

impl From<LockTimeout> for String {
    fn from(timeout: LockTimeout) -> Self {
        timeout.to_string()
    }
}

impl TryFrom<String> for LockTimeout {
    type Error = DavLockError;

    fn try_from(value: String) -> Result<Self> {
        parse_timeout(&value)
    }
}

/// Parse a `Timeout` header value.
///
/// # Returns
///
/// * `Ok(LockTimeout::Infinite)` - Empty input or `Infinite`
/// * `Ok(LockTimeout::Finite(_))` - `Second-N` with N <= 2^32-1
/// * `Err(DavLockError::InvalidTimeout)` - Anything else
pub fn parse_timeout(header: &str) -> Result<LockTimeout> {
    if header.is_empty() {
        return Ok(LockTimeout::Infinite);
    }

    let first = header.split(',').next().unwrap_or_default().trim();
    if first == "Infinite" {
        return Ok(LockTimeout::Infinite);
    }

    let caps = SECONDS_REGEX
        .captures(first)
        .ok_or_else(|| DavLockError::InvalidTimeout(header.to_string()))?;

    caps[1]
        .parse::<u32>()
        .map(LockTimeout::Finite)
        .map_err(|_| DavLockError::InvalidTimeout(header.to_string()))
}
