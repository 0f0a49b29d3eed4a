//! scan
//!
//! Output scanning: recognizing embedded commands in child output.
//!
//! # Modules
//!
//! - [`grammar`] - Parses `@@envrun[...]` command expressions out of text lines
//! - [`stream`] - Tees a child output stream to the console while feeding
//!   completed lines to the grammar and applying commands to the store
//!
//! # Design
//!
//! The two are deliberately split: the grammar is pure (line in, commands
//! out) and independently testable, while the stream scanner owns all
//! byte-level concerns (chunked reads, verbatim forwarding, line
//! reassembly across read boundaries).

pub mod grammar;
pub mod stream;

pub use grammar::{parse_line, Command};
pub use stream::scan_stream;
