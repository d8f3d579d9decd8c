//! Ballpark - a software-effort estimation library for teams and their tools.
//!
//! This library provides the core functionality for the `bp` CLI tool:
//! a feature catalog seeded with initial hour guesses, a tracked-time store
//! of real observations, and an estimation engine that combines the two
//! into per-feature statistics and project-level estimates.

pub mod action_log;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod models;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::storage::Storage;

    /// Test environment with isolated storage using dependency injection.
    ///
    /// Storage-layer and engine tests use `TestEnv::new()` + `init_storage()`
    /// so nothing touches the user's real data directory.
    pub struct TestEnv {
        /// Simulated project directory
        pub repo_dir: TempDir,
        /// Isolated data storage directory
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with isolated directories.
        pub fn new() -> Self {
            Self {
                repo_dir: TempDir::new().unwrap(),
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the simulated project directory.
        pub fn path(&self) -> &Path {
            self.repo_dir.path()
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.path(), self.data_path()).unwrap()
        }

        /// Open storage for this test environment.
        pub fn open_storage(&self) -> Storage {
            Storage::open_with_data_dir(self.path(), self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Ballpark operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `bp system init` first")]
    NotInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Malformed input: names the offending field and value.
    /// Always rejected before any mutation takes place.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A statistics function received zero values where at least one is
    /// required. Distinct from the zero-tracked-data case, which falls back
    /// to seed hours instead of erroring.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Internal invariant violation. Signals a programming defect, not a
    /// recoverable user error.
    #[error("Computation error: {0}")]
    Computation(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Ballpark operations.
pub type Result<T> = std::result::Result<T, Error>;
