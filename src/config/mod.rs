//! Configuration model for davlock.
//!
//! This module defines the `ManagerConfig` struct, loaded from YAML. Parsing is
//! forward-compatible (unknown fields are ignored), every field has a default,
//! and values are validated on load.

mod model;
mod operations;


// Re-export public API
pub use model::ManagerConfig;
