//! config
//!
//! Store path resolution.
//!
//! # Precedence
//!
//! The variable store path is resolved in this order (first match wins):
//! 1. `--database <path>` CLI flag
//! 2. `ENVRUN_DATABASE` environment variable
//! 3. `envrun.db` in the current working directory
//!
//! Falling back to the working-directory default is announced with a notice
//! on stdout so callers know which file the run is bound to.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming the store file.
pub const DATABASE_ENV_VAR: &str = "ENVRUN_DATABASE";

/// File name used when no store path is configured.
pub const DEFAULT_DATABASE_FILE: &str = "envrun.db";

/// Errors from configuration resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The working directory could not be determined for the default path.
    #[error("cannot determine working directory for default store path: {source}")]
    NoWorkingDir {
        #[source]
        source: std::io::Error,
    },
}

/// Resolved configuration for one wrapped invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the variable store file.
    pub database_path: PathBuf,
    /// True if the path fell back to the working-directory default.
    pub defaulted: bool,
}

impl Config {
    /// Resolve the store path from the CLI override, the environment, or
    /// the working-directory default.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoWorkingDir`] if no path is configured and the
    /// current working directory is unavailable.
    pub fn resolve(cli_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = cli_override {
            return Ok(Config {
                database_path: path,
                defaulted: false,
            });
        }

        if let Some(path) = env::var_os(DATABASE_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(Config {
                database_path: PathBuf::from(path),
                defaulted: false,
            });
        }

        let cwd = env::current_dir().map_err(|source| ConfigError::NoWorkingDir { source })?;
        Ok(Config {
            database_path: cwd.join(DEFAULT_DATABASE_FILE),
            defaulted: true,
        })
    }

    /// The notice printed when the working-directory default is used.
    pub fn default_notice(&self) -> String {
        format!(
            "The {} environment variable is not set, using {} instead.",
            DATABASE_ENV_VAR,
            self.database_path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that depend on ENVRUN_DATABASE being present in the process
    // environment live in tests/cli.rs, where the variable is injected per
    // spawned process instead of mutating this process's environment.

    #[test]
    fn cli_override_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/custom.db"))).expect("resolve");
        assert_eq!(config.database_path, PathBuf::from("/tmp/custom.db"));
        assert!(!config.defaulted);
    }

    #[test]
    fn default_notice_names_variable_and_path() {
        let config = Config {
            database_path: PathBuf::from("/work/envrun.db"),
            defaulted: true,
        };
        let notice = config.default_notice();
        assert!(notice.contains("ENVRUN_DATABASE"));
        assert!(notice.contains("envrun.db"));
    }
}
