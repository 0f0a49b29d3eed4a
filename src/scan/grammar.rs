//! scan::grammar
//!
//! The embedded command grammar.
//!
//! # Grammar
//!
//! A command expression has the outer form `@@envrun[ <body> ]` with
//! insignificant whitespace around the body. The body must be one of:
//!
//! - `set name='<name>' value='<value>'`
//! - `reset name='<name>'`
//!
//! Anything else inside a recognized wrapper is reported as malformed so
//! the caller can surface a diagnostic; it never mutates the store.
//!
//! The patterns are fixed wire format. The captures are non-greedy, so a
//! name or value containing a single quote or `]` truncates the match
//! early; that limitation is part of the format and must not be "fixed"
//! here (it would be a wire-format change).

use std::sync::OnceLock;

use regex::Regex;

/// One parsed command from a line of child output.
///
/// Commands are transient; only their effect on the store persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set a variable to a value (value may be empty).
    Set {
        /// Variable name.
        name: String,
        /// Variable value.
        value: String,
    },
    /// Remove a variable. The name may be empty (kept for compatibility).
    Reset {
        /// Variable name.
        name: String,
    },
    /// A recognized `@@envrun[...]` wrapper with an unrecognized body.
    Malformed {
        /// The raw body text inside the brackets.
        body: String,
    },
}

/// Outer expression: `@@envrun[ <body> ]`, body captured trimmed.
fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@envrun\[\s*(.+?)\s*\]").expect("expression regex"))
}

/// Set body: `set name='<name>' value='<value>'`.
fn set_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^set\s*name\s*=\s*'(.+?)'\s*value\s*=\s*'(.*?)'$").expect("set regex")
    })
}

/// Reset body: `reset name='<name>'`.
fn reset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^reset\s*name\s*=\s*'(.*?)'$").expect("reset regex"))
}

/// Parse every command expression on one line of text.
///
/// Expressions are returned in left-to-right order of appearance. A line
/// with no expressions yields an empty vector.
pub fn parse_line(line: &str) -> Vec<Command> {
    expression_regex()
        .captures_iter(line)
        .map(|expression| {
            let body = &expression[1];
            if let Some(set) = set_regex().captures(body) {
                Command::Set {
                    name: set[1].to_string(),
                    value: set[2].to_string(),
                }
            } else if let Some(reset) = reset_regex().captures(body) {
                Command::Reset {
                    name: reset[1].to_string(),
                }
            } else {
                Command::Malformed {
                    body: body.to_string(),
                }
            }
        })
        .collect()
}
