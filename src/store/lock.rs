//! store::lock
//!
//! Exclusive lock on the variable store file.
//!
//! # Architecture
//!
//! The store lock ensures only one EnvRun invocation can read and write a
//! given store file at a time. Overlapping invocations targeting the same
//! path would otherwise interleave their read-modify-write cycles and lose
//! updates.
//!
//! The lock is taken on the store file itself, and the locked handle is the
//! only handle the store reads from and writes to. It is held for the whole
//! run, from load to save.
//!
//! # Invariants
//!
//! - Lock must be held from store load to store save
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("store file is locked by another EnvRun process")]
    AlreadyLocked,

    /// Failed to create or open the store file.
    #[error("failed to open store file: {0}")]
    OpenFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a store file.
///
/// The guard owns the open file handle carrying the OS-level lock. All
/// store I/O goes through this handle, so the file can never be touched
/// while unlocked. The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct StoreLock {
    /// Path to the store file.
    path: PathBuf,
    /// The open file handle with the lock held.
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl StoreLock {
    /// Attempt to acquire an exclusive lock on the store file.
    ///
    /// The file (and its parent directory) is created if absent. The lock
    /// is non-blocking - if another process holds it, this returns
    /// [`LockError::AlreadyLocked`] immediately.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::OpenFailed`] if the file cannot be created or opened
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::OpenFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                LockError::OpenFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        // Try to acquire an exclusive lock (non-blocking)
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: path.to_path_buf(),
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The locked handle, or an error if the lock was already released.
    fn locked_file(&mut self) -> std::io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store lock already released")
        })
    }

    /// Read the full contents of the locked file.
    pub fn read_contents(&mut self) -> std::io::Result<String> {
        let file = self.locked_file()?;
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }

    /// Replace the full contents of the locked file.
    ///
    /// The previous contents are discarded entirely, never patched.
    pub fn replace_contents(&mut self, contents: &str) -> std::io::Result<()> {
        let file = self.locked_file()?;
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Release the lock explicitly.
    ///
    /// This is called automatically on drop, but can be called early to
    /// hand the file over before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
