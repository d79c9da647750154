//! Command implementations for davlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod replay;
mod timeout;

use crate::cli::{Cli, Command};
use davlock::config::ManagerConfig;
use davlock::error::Result;

/// Dispatch a command to its implementation.
///
/// Loads the manager config first when `--config` is given; otherwise the
/// defaults apply.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };

    match cli.command {
        Command::Timeout(args) => timeout::cmd_timeout(args),
        Command::Replay(args) => replay::cmd_replay(args, &config),
    }
}
