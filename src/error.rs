//! Error types for davlock.
//!
//! Uses thiserror for derive macros. The four lock sentinels (`ConfirmationFailed`,
//! `Forbidden`, `Locked`, `NoSuchLock`) are the boundary contract with the
//! protocol handler; the handler maps each of them to a wire status.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for davlock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DavLockError {
    /// None of the presented conditions could be claimed. The caller may retry
    /// with another condition set.
    #[error("confirmation failed")]
    ConfirmationFailed,

    /// The caller is not allowed to perform the operation.
    #[error("forbidden")]
    Forbidden,

    /// The resource (or the lock itself) is locked.
    #[error("locked")]
    Locked,

    /// The lock token or resource has no lock.
    #[error("no such lock")]
    NoSuchLock,

    /// The Timeout header could not be parsed.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// The lock manager detected a broken internal invariant.
    #[error("internal lock manager fault: {0}")]
    Internal(String),

    /// User provided invalid arguments, config, or script.
    #[error("{0}")]
    UserError(String),

    /// A replay step did not produce the outcome it declared.
    #[error("replay expectation failed: {0}")]
    ExpectationMismatch(String),
}

impl DavLockError {
    /// Whether the caller is expected to retry with a different claim set.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DavLockError::ConfirmationFailed)
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DavLockError::UserError(_) => exit_codes::USER_ERROR,
            DavLockError::InvalidTimeout(_) => exit_codes::USER_ERROR,
            DavLockError::ConfirmationFailed => exit_codes::CONFIRMATION_FAILED,
            DavLockError::Forbidden => exit_codes::FORBIDDEN,
            DavLockError::Locked => exit_codes::LOCKED,
            DavLockError::NoSuchLock => exit_codes::NO_SUCH_LOCK,
            DavLockError::Internal(_) => exit_codes::INTERNAL_FAULT,
            DavLockError::ExpectationMismatch(_) => exit_codes::EXPECTATION_MISMATCH,
        }
    }
}

/// Result type alias for davlock operations.
pub type Result<T> = std::result::Result<T, DavLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_confirmation_failure_is_retryable() {
        assert!(DavLockError::ConfirmationFailed.is_retryable());
        assert!(!DavLockError::Locked.is_retryable());
        assert!(!DavLockError::NoSuchLock.is_retryable());
        assert!(!DavLockError::Forbidden.is_retryable());
        assert!(!DavLockError::Internal("x".to_string()).is_retryable());
    }

    #[test]
    fn sentinels_have_distinct_exit_codes() {
        assert_eq!(DavLockError::Locked.exit_code(), exit_codes::LOCKED);
        assert_eq!(DavLockError::NoSuchLock.exit_code(), exit_codes::NO_SUCH_LOCK);
        assert_eq!(
            DavLockError::ConfirmationFailed.exit_code(),
            exit_codes::CONFIRMATION_FAILED
        );
        assert_eq!(
            DavLockError::Internal("held twice".to_string()).exit_code(),
            exit_codes::INTERNAL_FAULT
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = DavLockError::InvalidTimeout("Second-x".to_string());
        assert_eq!(err.to_string(), "invalid timeout: Second-x");

        let err = DavLockError::Internal("node already held".to_string());
        assert_eq!(
            err.to_string(),
            "internal lock manager fault: node already held"
        );
    }
}
