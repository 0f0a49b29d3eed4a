//! runner
//!
//! Orchestrates one wrapped execution end to end.
//!
//! # Lifecycle
//!
//! ```text
//! resolve config -> load store (lock held) -> expand argv -> spawn child
//!   -> scan stdout + stderr concurrently -> wait -> save store (lock released)
//! ```
//!
//! # Invariants
//!
//! - Fatal errors before the spawn mean no child is ever started and the
//!   store is never mutated
//! - The two stream scanners make independent progress; neither blocks on
//!   the other, and both run until their pipe closes
//! - On the success path the wrapper's exit code is the child's, verbatim
//!
//! # Exit codes
//!
//! Each fatal error class maps to its own stable exit code so calling
//! scripts can branch on the failure kind. The success-path exit code is
//! whatever the child returned and may collide with these values; the
//! distinction only matters for the fatal classes, which always print an
//! `error:` diagnostic.

use std::io;
use std::path::PathBuf;
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::expand;
use crate::scan;
use crate::store::lock::LockError;
use crate::store::{StoreError, VarStore};
use crate::ui::output::{self, Verbosity};

/// Exit code for usage errors (produced by clap, documented here).
pub const EXIT_USAGE: i32 = 2;
/// Exit code for configuration errors.
pub const EXIT_CONFIG: i32 = 10;
/// Exit code for a malformed store file.
pub const EXIT_STORE_FORMAT: i32 = 11;
/// Exit code for store I/O failures.
pub const EXIT_STORE_IO: i32 = 12;
/// Exit code when the store file is locked by another invocation.
pub const EXIT_STORE_LOCKED: i32 = 13;
/// Exit code when the child process cannot be started or awaited.
pub const EXIT_CHILD: i32 = 14;

/// Errors that abort a wrapped invocation.
#[derive(Debug, Error)]
pub enum RunError {
    /// Store path resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Loading the store failed; no child was started.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The child process could not be created. No store mutation occurred.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        #[source]
        source: io::Error,
    },

    /// Waiting for the child process failed.
    #[error("failed to wait for child process: {0}")]
    Wait(#[source] io::Error),

    /// The child ran, but its published variables could not be persisted.
    ///
    /// Surfaced as a fatal error rather than swallowed: losing the run's
    /// variables must be visible to the caller. The child's own exit code
    /// is carried in the message.
    #[error("failed to save variable store (child exited with code {child_code}): {source}")]
    SaveFailed {
        /// Exit code the invocation would otherwise have returned.
        child_code: i32,
        #[source]
        source: StoreError,
    },
}

impl RunError {
    /// The stable exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) => EXIT_CONFIG,
            RunError::Store(source) | RunError::SaveFailed { source, .. } => {
                store_exit_code(source)
            }
            RunError::Spawn { .. } | RunError::Wait(_) => EXIT_CHILD,
        }
    }
}

fn store_exit_code(error: &StoreError) -> i32 {
    match error {
        StoreError::Format { .. } => EXIT_STORE_FORMAT,
        StoreError::Io { .. } => EXIT_STORE_IO,
        StoreError::Lock(LockError::AlreadyLocked) => EXIT_STORE_LOCKED,
        StoreError::Lock(_) => EXIT_STORE_IO,
    }
}

/// Per-invocation context assembled by the CLI layer.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output verbosity derived from `--quiet`/`--debug`.
    pub verbosity: Verbosity,
    /// Store path override from `--database`.
    pub database: Option<PathBuf>,
}

/// Execute one wrapped invocation and return the exit code to propagate.
///
/// `program` and `args` are the literal command line for the child; both
/// go through placeholder expansion before the spawn. The child inherits
/// the wrapper's environment with every store entry layered on top (store
/// entries win over same-named inherited variables).
pub fn run(ctx: &Context, program: &str, args: &[String]) -> Result<i32, RunError> {
    let config = Config::resolve(ctx.database.clone())?;
    if config.defaulted {
        output::print(config.default_notice(), ctx.verbosity);
    }
    output::debug(
        format!("variable store: {}", config.database_path.display()),
        ctx.verbosity,
    );

    let store = VarStore::load(&config.database_path)?;

    let program = expand::expand_arg(program, &store, ctx.verbosity);
    let args = expand::expand_args(args, &store, ctx.verbosity);

    let mut command = ProcessCommand::new(&program);
    command
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (name, value) in store.entries() {
        command.env(name, value);
    }

    let mut child = command.spawn().map_err(|source| RunError::Spawn {
        program: program.clone(),
        source,
    })?;
    let child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();

    let store = Mutex::new(store);
    let status = thread::scope(|scope| {
        let stdout_scanner = child_stdout
            .map(|pipe| scope.spawn(|| scan::scan_stream(pipe, io::stdout(), &store, ctx.verbosity)));
        let stderr_scanner = child_stderr
            .map(|pipe| scope.spawn(|| scan::scan_stream(pipe, io::stderr(), &store, ctx.verbosity)));

        // Drain both pipes to EOF before reaping the child so no trailing
        // output or command expression is lost.
        report_scanner_result("stdout", stdout_scanner.map(|h| h.join()), ctx.verbosity);
        report_scanner_result("stderr", stderr_scanner.map(|h| h.join()), ctx.verbosity);

        child.wait()
    })
    .map_err(RunError::Wait)?;

    let child_code = exit_code_of(status);
    output::debug(format!("child exited with code {child_code}"), ctx.verbosity);

    let store = store.into_inner().unwrap_or_else(PoisonError::into_inner);
    store
        .save()
        .map_err(|source| RunError::SaveFailed { child_code, source })?;

    Ok(child_code)
}

/// Surface a finished scanner's outcome. Pipe errors after a successful
/// spawn are diagnostics, not fatal: the child's exit code still decides
/// the invocation's result.
fn report_scanner_result(
    stream: &str,
    result: Option<thread::Result<io::Result<()>>>,
    verbosity: Verbosity,
) {
    match result {
        None | Some(Ok(Ok(()))) => {}
        Some(Ok(Err(e))) => output::warn(format!("{stream} stream error: {e}"), verbosity),
        Some(Err(_)) => output::warn(format!("{stream} scanner thread panicked"), verbosity),
    }
}

/// Map a child's exit status to the code the wrapper propagates.
///
/// Signal deaths on Unix follow the shell convention of `128 + signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
