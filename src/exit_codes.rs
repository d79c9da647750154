//! Exit code constants for the davlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, config, script, or timeout header)
//! - 2: Confirmation failed
//! - 3: Forbidden
//! - 4: Locked
//! - 5: No such lock
//! - 6: Internal lock manager fault
//! - 7: Replay expectation mismatch

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable config or script, invalid timeout.
pub const USER_ERROR: i32 = 1;

/// A Confirm call could not claim the requested resources.
pub const CONFIRMATION_FAILED: i32 = 2;

/// The operation was forbidden.
pub const FORBIDDEN: i32 = 3;

/// The resource or lock is locked.
pub const LOCKED: i32 = 4;

/// No lock matched the token or resource.
pub const NO_SUCH_LOCK: i32 = 5;

/// The lock manager detected a broken internal invariant.
pub const INTERNAL_FAULT: i32 = 6;

/// A replay step produced an outcome other than the one it expected.
pub const EXPECTATION_MISMATCH: i32 = 7;
