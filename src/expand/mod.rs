//! expand
//!
//! Placeholder expansion over the wrapper's argument vector.
//!
//! # Contract
//!
//! Every `{{ name }}` token (whitespace inside the braces insignificant) in
//! an argument is replaced with a resolved value: the variable store is
//! consulted first, then the inherited environment. An unresolvable name
//! produces a diagnostic and the placeholder text stays in place; it never
//! aborts the run.
//!
//! The expanded vector is handed to `std::process::Command` as-is. No
//! quoting layer is needed: arguments reach the OS as an argument vector,
//! never through a shell.

use std::env;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::store::VarStore;
use crate::ui::output::{self, Verbosity};

/// Placeholder token: `{{ <name> }}`. Fixed wire format.
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").expect("placeholder regex"))
}

/// Expand every placeholder in one argument, left to right.
pub fn expand_arg(arg: &str, store: &VarStore, verbosity: Verbosity) -> String {
    placeholder_regex()
        .replace_all(arg, |captures: &Captures| {
            let name = &captures[1];
            if let Some(value) = store.get(name) {
                value.to_string()
            } else if let Ok(value) = env::var(name) {
                value
            } else {
                output::warn(format!("unresolved placeholder: {}", &captures[0]), verbosity);
                captures[0].to_string()
            }
        })
        .into_owned()
}

/// Expand placeholders in a whole argument vector.
pub fn expand_args(args: &[String], store: &VarStore, verbosity: Verbosity) -> Vec<String> {
    args.iter()
        .map(|arg| expand_arg(arg, store, verbosity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn store_with(entries: &[(&str, &str)]) -> (TempDir, VarStore) {
        let temp = TempDir::new().expect("temp dir");
        let path: PathBuf = temp.path().join("envrun.db");
        let mut store = VarStore::load(&path).expect("load store");
        for (name, value) in entries {
            store.set(*name, *value);
        }
        (temp, store)
    }

    #[test]
    fn plain_arguments_pass_through() {
        let (_temp, store) = store_with(&[]);
        assert_eq!(expand_arg("--flag=3", &store, Verbosity::Quiet), "--flag=3");
    }

    #[test]
    fn store_value_is_substituted() {
        let (_temp, store) = store_with(&[("X", "hello")]);
        assert_eq!(expand_arg("{{X}}", &store, Verbosity::Quiet), "hello");
    }

    #[test]
    fn whitespace_inside_braces_is_insignificant() {
        let (_temp, store) = store_with(&[("X", "hello")]);
        assert_eq!(expand_arg("{{  X  }}", &store, Verbosity::Quiet), "hello");
    }

    #[test]
    fn store_takes_precedence_over_environment() {
        let (_temp, store) = store_with(&[("PATH", "store-wins")]);
        // PATH is always present in the inherited environment.
        assert_eq!(expand_arg("{{PATH}}", &store, Verbosity::Quiet), "store-wins");
    }

    #[test]
    fn environment_is_the_fallback() {
        let (_temp, store) = store_with(&[]);
        let expanded = expand_arg("{{PATH}}", &store, Verbosity::Quiet);
        assert_eq!(expanded, env::var("PATH").expect("PATH set"));
    }

    #[test]
    fn unresolved_placeholder_stays_in_place() {
        let (_temp, store) = store_with(&[]);
        let arg = "{{ENVRUN_TEST_SURELY_UNSET_1234}}";
        assert_eq!(expand_arg(arg, &store, Verbosity::Quiet), arg);
    }

    #[test]
    fn multiple_placeholders_resolve_independently() {
        let (_temp, store) = store_with(&[("A", "1"), ("B", "2")]);
        assert_eq!(
            expand_arg("{{A}}-{{B}}-{{MISSING_99}}", &store, Verbosity::Quiet),
            "1-2-{{MISSING_99}}"
        );
    }

    #[test]
    fn placeholder_embedded_in_argument_text() {
        let (_temp, store) = store_with(&[("DIR", "/tmp/out")]);
        assert_eq!(
            expand_arg("--output={{DIR}}/log.txt", &store, Verbosity::Quiet),
            "--output=/tmp/out/log.txt"
        );
    }

    #[test]
    fn whole_vector_is_expanded() {
        let (_temp, store) = store_with(&[("X", "x")]);
        let args = vec!["{{X}}".to_string(), "plain".to_string()];
        assert_eq!(
            expand_args(&args, &store, Verbosity::Quiet),
            vec!["x".to_string(), "plain".to_string()]
        );
    }
}
