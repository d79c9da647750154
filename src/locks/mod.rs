//! Locking subsystem for davlock.
//!
//! This module implements the LOCK/UNLOCK semantics of WebDAV over a namespace
//! of slash-separated resource paths:
//! - Exclusive locks of zero or infinite depth
//! - Opaque lock tokens, unique within the process
//! - Lazy expiry driven by the `now` each operation is given
//!
//! # Containment
//!
//! An infinite-depth lock covers its whole subtree: no other lock may be
//! created anywhere inside it, and it cannot be created over an already locked
//! descendant. A zero-depth lock covers only its exact path.
//!
//! # Claims
//!
//! A protocol request that touches locked resources first calls
//! [`LockManager::confirm`] with the tokens it presented. The returned
//! [`Claim`] keeps those locks held (they cannot expire, be confirmed again,
//! refreshed, or unlocked) until it is passed to [`LockManager::release`].
//! [`ClaimGuard`] does the release when dropped.

mod expiry;
mod guard;
mod manager;
mod namespace;
mod tokens;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use guard::{Claim, ClaimGuard};
pub use manager::LockManager;
pub use types::{Condition, LockDetails, LockInfo};
