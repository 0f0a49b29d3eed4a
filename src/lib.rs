//! EnvRun - a process wrapper that carries environment variables across runs
//!
//! EnvRun executes another program with its standard output and standard
//! error tee'd through the wrapper. The streams are forwarded to the real
//! console byte-for-byte while being scanned for embedded `@@envrun[...]`
//! command expressions that set or reset variables in a durable store.
//! The store is written back when the child exits, so the *next* wrapped
//! invocation sees those variables in its environment and can substitute
//! them into its own argument vector via `{{ name }}` placeholders.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to runner)
//! - [`runner`] - Orchestrates one wrapped execution end to end
//! - [`scan`] - Output scanning: command grammar and the stream scanner
//! - [`store`] - Durable variable store with exclusive file locking
//! - [`expand`] - Placeholder expansion over the wrapper's argument vector
//! - [`config`] - Store path resolution
//! - [`ui`] - Diagnostic output utilities
//!
//! # Correctness Invariants
//!
//! EnvRun maintains the following invariants:
//!
//! 1. Child output reaches the console unmodified, in order, live
//! 2. The store file is reconciled exactly twice per run: load and save
//! 3. An exclusive OS lock on the store file is held from load to save
//! 4. The wrapper's exit code mirrors the child's on the success path

pub mod cli;
pub mod config;
pub mod expand;
pub mod runner;
pub mod scan;
pub mod store;
pub mod ui;
