//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Everything from the program path onward belongs to the wrapped child:
//! the command line is captured as one trailing vector, so the child's own
//! flags pass through untouched even when they collide with the wrapper's.
//! Wrapper flags must precede the program path. A missing program path is
//! a usage error (exit 2).

use clap::Parser;
use std::path::PathBuf;

use crate::ui::output::Verbosity;

const AFTER_HELP: &str = "\
USAGE NOTES:
    Step 1, optional)
        Set the ENVRUN_DATABASE environment variable (or pass --database)
        to the path of the variable store file. If not set, envrun.db in
        the working directory is used and a notice is printed.

    Step 2)
        Start applications through the wrapper: envrun <program> [args]...

    The following expressions are recognized in the output streams:
    - @@envrun[set name='<name>' value='<value>']
    - @@envrun[reset name='<name>']

    Occurrences of {{ name }} in the wrapper's own arguments are replaced
    before the child starts, from the store first and the inherited
    environment second.

EXIT CODES:
    On success the wrapper exits with the child's own exit code. Fatal
    wrapper errors use distinct codes: 2 usage, 10 configuration,
    11 malformed store file, 12 store I/O, 13 store locked by another
    invocation, 14 child process could not be started.";

/// EnvRun - wraps process executions and scans their output (stdout/stderr)
/// for expressions that maintain a set of environment variables for
/// following runs.
#[derive(Parser, Debug)]
#[command(name = "envrun")]
#[command(author, version, about, long_about = None)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Path of the variable store file (overrides ENVRUN_DATABASE)
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Program to execute, followed by its arguments
    #[arg(
        value_name = "PROGRAM",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Output verbosity from the global flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_is_a_usage_error() {
        assert!(Cli::try_parse_from(["envrun"]).is_err());
    }

    #[test]
    fn program_and_arguments_are_captured_in_order() {
        let cli = Cli::try_parse_from(["envrun", "make", "all", "install"]).expect("parse");
        assert_eq!(cli.command, vec!["make", "all", "install"]);
    }

    #[test]
    fn child_flags_pass_through() {
        let cli = Cli::try_parse_from(["envrun", "cargo", "build", "--release", "-q"])
            .expect("parse");
        assert_eq!(cli.command, vec!["cargo", "build", "--release", "-q"]);
        assert!(!cli.quiet);
    }

    #[test]
    fn database_flag_is_consumed_by_the_wrapper() {
        let cli = Cli::try_parse_from(["envrun", "--database", "/tmp/db", "true"]).expect("parse");
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/db")));
        assert_eq!(cli.command, vec!["true"]);
    }

    #[test]
    fn wrapper_flags_after_the_program_belong_to_the_child() {
        let cli = Cli::try_parse_from(["envrun", "prog", "--database", "x"]).expect("parse");
        assert_eq!(cli.database, None);
        assert_eq!(cli.command, vec!["prog", "--database", "x"]);
    }
}
