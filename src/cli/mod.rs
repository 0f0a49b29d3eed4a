//! cli
//!
//! Command-line interface layer for EnvRun.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and flags
//! - Delegate to the [`crate::runner`] for execution
//! - Map fatal errors to their stable exit codes
//!
//! The CLI layer is thin. Usage errors (including an empty command line)
//! are reported by clap itself with exit code 2.

pub mod args;

pub use args::Cli;

use crate::runner;
use crate::ui::output;

/// Run the CLI application and return the process exit code.
///
/// This is the main entry point called from `main.rs`. On the success
/// path the returned code is the wrapped child's own exit code.
pub fn run() -> i32 {
    let cli = Cli::parse_args();

    let ctx = runner::Context {
        verbosity: cli.verbosity(),
        database: cli.database.clone(),
    };

    // clap enforces at least one command token.
    let Some((program, args)) = cli.command.split_first() else {
        return runner::EXIT_USAGE;
    };

    match runner::run(&ctx, program, args) {
        Ok(code) => code,
        Err(err) => {
            output::error(&err);
            err.exit_code()
        }
    }
}
