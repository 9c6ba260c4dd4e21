//! Test context and harness
//!
//! Bundles a temp directory with the mock collaborators a backup run needs.

use crate::fixtures::fixed_instant;
use anyhow::Result;
use archivist::managers::context::BackupContext;
use archivist::utils::executor::mock::MockExecutor;
use archivist::utils::template::FixedClock;
use archivist::vaults::mock::{MockArchiveStore, MockClientFactory, MockObjectStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    pub executor: MockExecutor,
    pub object_store: MockObjectStore,
    pub archive_store: MockArchiveStore,
    pub clients: MockClientFactory,
}

impl TestContext {
    /// Accepting stores and a succeeding executor
    pub fn new() -> Self {
        Self::with_stores(MockObjectStore::new(), MockArchiveStore::new())
    }

    pub fn with_stores(object_store: MockObjectStore, archive_store: MockArchiveStore) -> Self {
        let clients = MockClientFactory::new()
            .with_object_store(object_store.clone())
            .with_archive_store(archive_store.clone());

        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
            executor: MockExecutor::new(),
            object_store,
            archive_store,
            clients,
        }
    }

    pub fn with_executor(mut self, executor: MockExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Collaborators for [`archivist::BackupRunner::build`], clock fixed at
    /// [`fixed_instant`]
    pub fn backup_context(&self) -> BackupContext {
        BackupContext::new(
            Arc::new(self.executor.clone()),
            Arc::new(FixedClock(fixed_instant())),
            Arc::new(self.clients.clone()),
        )
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a subdirectory in the temp dir
    pub fn create_subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.temp_dir.path().join(name);
        Ok(std::fs::read_to_string(path)?)
    }

    /// Entries directly under `dir`, sorted by name
    pub fn list_dir(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display + std::fmt::Debug> ResultAssertions<T>
    for Result<T, E>
{
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
