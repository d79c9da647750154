//! CLI argument parsing for davlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// davlock: in-memory WebDAV lock manager.
///
/// Parses Timeout headers and replays scripted lock sessions against a
/// fresh lock manager, with time advanced only by the script.
#[derive(Parser, Debug)]
#[command(name = "davlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter (e.g. "debug", "davlock=trace"). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to a YAML manager config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for davlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a Timeout header value.
    ///
    /// Prints the normalized form ("Infinite" or "Second-N").
    Timeout(TimeoutArgs),

    /// Replay a scripted lock session.
    ///
    /// Runs create/refresh/unlock/confirm/release/lookup/delete steps from a
    /// YAML script against one in-memory lock manager.
    Replay(ReplayArgs),
}

/// Arguments for the `timeout` command.
#[derive(Parser, Debug)]
pub struct TimeoutArgs {
    /// Header value, e.g. "Second-3600" or "Infinite, Second-60".
    #[arg(allow_hyphen_values = true)]
    pub header: String,
}

/// Arguments for the `replay` command.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Path to the YAML script.
    pub script: PathBuf,

    /// Print one JSON object per step instead of text.
    #[arg(long)]
    pub json: bool,
}
