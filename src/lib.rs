//! davlock: in-memory WebDAV lock manager.
//!
//! Tracks exclusive locks over a namespace of slash-separated resource paths,
//! enforces containment between locks on ancestors and descendants, issues
//! opaque lock tokens, and expires locks lazily from the time each call is
//! given.
//!
//! ```
//! use chrono::Utc;
//! use davlock::locks::{Condition, LockDetails, LockManager};
//! use davlock::timeout::parse_timeout;
//!
//! let manager = LockManager::new();
//! let now = Utc::now();
//! let timeout = parse_timeout("Second-60")?;
//! let token = manager.create(now, LockDetails::new("/docs", timeout, false))?;
//!
//! let claim = manager.confirm(now, "/docs/readme.txt", "", &[Condition::token(&token)])?;
//! manager.release(claim)?;
//! manager.unlock(now, &token)?;
//! # Ok::<(), davlock::error::DavLockError>(())
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod locks;
pub mod path;
pub mod timeout;
