//! store
//!
//! The durable variable store.
//!
//! # Architecture
//!
//! The store is a name→value mapping backed 1:1 by a UTF-8 text file, one
//! `name = 'value'` line per entry, sorted ascending by name. It is read
//! once at load and rewritten in full at save; between the two the on-disk
//! file does not track in-memory mutations.
//!
//! An exclusive OS lock (see [`lock`]) is taken on the backing file at load
//! and held until save, serializing overlapping EnvRun invocations that
//! share a store path.
//!
//! # Invariants
//!
//! - File and memory are reconciled exactly twice: load and save
//! - Save order is byte-wise lexicographic ascending by name
//! - A malformed line aborts the load; a corrupt store is never repaired
//!   or partially read
//!
//! # Example
//!
//! ```no_run
//! use envrun::store::VarStore;
//! use std::path::Path;
//!
//! let mut store = VarStore::load(Path::new("envrun.db"))?;
//! store.set("BUILD_ID", "42");
//! store.save()?;
//! # Ok::<(), envrun::store::StoreError>(())
//! ```

pub mod lock;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use lock::{LockError, StoreLock};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A line of the backing file does not match the store grammar.
    #[error("malformed store file {path} (line: {line})")]
    Format {
        /// Path of the offending file.
        path: PathBuf,
        /// 1-based number of the offending line.
        line: usize,
    },

    /// I/O failure while reading or writing the backing file.
    #[error("store i/o error on {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Locking the backing file failed.
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Store line grammar: `name = 'value'` with flexible whitespace.
///
/// The name capture is non-greedy up to the first `=`; the value is what
/// lies between the first quote after `=` and the last quote on the line.
/// Fixed wire format.
fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(.+?)\s*=\s*'(.*?)'\s*$").expect("store line regex"))
}

/// The in-memory variable store, bound to its locked backing file.
///
/// One instance owns the store file for the duration of a run. Ownership is
/// established by the exclusive lock taken in [`VarStore::load`] and given
/// up when the store is saved or dropped.
#[derive(Debug)]
pub struct VarStore {
    /// Held lock and file handle for the backing file.
    lock: StoreLock,
    /// Entries, ordered byte-wise ascending by name.
    entries: BTreeMap<String, String>,
}

impl VarStore {
    /// Load the store from its backing file, creating the file if absent.
    ///
    /// Takes the exclusive lock first; the lock stays held until the store
    /// is saved or dropped.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Lock`] if the file is locked by another invocation
    ///   or cannot be opened
    /// - [`StoreError::Io`] if reading fails
    /// - [`StoreError::Format`] on the first malformed line; the store is
    ///   not usable and the whole invocation must abort
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut lock = StoreLock::acquire(path)?;
        let contents = lock.read_contents().map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut entries = BTreeMap::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let captures = line_regex()
                .captures(line)
                .ok_or_else(|| StoreError::Format {
                    path: path.to_path_buf(),
                    line: index + 1,
                })?;
            entries.insert(captures[1].to_string(), captures[2].to_string());
        }

        Ok(Self { lock, entries })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Insert or overwrite a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Delete a variable. No-op if absent.
    pub fn reset(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in save order (byte-wise ascending by name).
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Serialize all entries back to the backing file and release the lock.
    ///
    /// The file's prior content is overwritten in full. Entries are written
    /// sorted ascending by name, one `name = 'value'` line each; the order
    /// is a contract that keeps the file deterministic across runs.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if writing fails. The lock is released either
    /// way when the store is dropped.
    pub fn save(mut self) -> Result<(), StoreError> {
        let mut contents = String::new();
        for (name, value) in &self.entries {
            contents.push_str(name);
            contents.push_str(" = '");
            contents.push_str(value);
            contents.push_str("'\n");
        }

        self.lock
            .replace_contents(&contents)
            .map_err(|source| StoreError::Io {
                path: self.lock.path().to_path_buf(),
                source,
            })?;
        self.lock.release()?;
        Ok(())
    }
}
