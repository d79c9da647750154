//! Implementation of the `davlock replay` command.
//!
//! Replays a YAML script of timed lock operations against one in-memory lock
//! manager. Time only advances through each step's `at` offset, so a script
//! always produces the same outcomes.

mod runner;
mod script;


use crate::cli::ReplayArgs;
use davlock::config::ManagerConfig;
use davlock::error::{DavLockError, Result};
use runner::Replay;
use script::Script;

/// Execute the `davlock replay` command.
///
/// Prints one line (or JSON object with `--json`) per step, then fails with
/// an expectation mismatch if any step declared an outcome it did not get.
pub fn cmd_replay(args: ReplayArgs, config: &ManagerConfig) -> Result<()> {
    let script = Script::load(&args.script)?;
    let reports = Replay::new(config)?.run(&script)?;

    for report in &reports {
        if args.json {
            let line = serde_json::to_string(report).map_err(|e| {
                DavLockError::UserError(format!("failed to serialize step report: {}", e))
            })?;
            println!("{}", line);
        } else {
            println!("{}", report);
        }
    }

    let mismatches: Vec<String> = reports
        .iter()
        .filter(|r| !r.matches_expectation())
        .map(|r| {
            format!(
                "step {} ({}): expected {}, got {}",
                r.step,
                r.op,
                r.expected.map(|e| e.to_string()).unwrap_or_default(),
                r.outcome
            )
        })
        .collect();

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(DavLockError::ExpectationMismatch(mismatches.join("; ")))
    }
}
