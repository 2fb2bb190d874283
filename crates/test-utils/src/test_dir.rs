//! Temporary directories for on-disk ledger tests.
//!
//! [`TestDir`] wraps [`tempfile::TempDir`] and knows where the ledger database
//! file lives inside it, so persistence tests can open, drop, and reopen the
//! same store.

// Test utilities are expected to panic on failure
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use campus_ledger_storage::StorageEngine;
use tempfile::TempDir;

/// File name of the ledger database inside a data directory.
pub const DATABASE_FILE: &str = "ledger.redb";

/// A managed temporary data directory.
///
/// Removed from disk when dropped.
///
/// # Example
///
/// ```
/// use campus_ledger_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let engine = dir.open_storage();
/// drop(engine);
/// // Reopening sees everything committed before the drop.
/// let _engine = dir.open_storage();
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Creates a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = tempfile::Builder::new()
            .prefix("campus-ledger-test-")
            .tempdir()
            .expect("failed to create temp directory");
        Self { inner }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Joins a relative path onto the directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }

    /// Path of the ledger database file in this directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.join(DATABASE_FILE)
    }

    /// Opens (or creates) the ledger database in this directory.
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be opened, for example while another
    /// engine still holds it.
    #[must_use]
    pub fn open_storage(&self) -> StorageEngine {
        StorageEngine::open(self.database_path()).expect("failed to open ledger database")
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
