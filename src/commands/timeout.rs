//! Implementation of the `davlock timeout` command.

use crate::cli::TimeoutArgs;
use davlock::error::Result;
use davlock::timeout::parse_timeout;

/// Execute the `davlock timeout` command.
///
/// Prints the normalized header form. Unparseable headers fail with
/// `InvalidTimeout` (exit code 1).
pub fn cmd_timeout(args: TimeoutArgs) -> Result<()> {
    let timeout = parse_timeout(&args.header)?;
    println!("{}", timeout);
    Ok(())
}
