//! Test utilities for archivist
//!
//! This crate provides shared test utilities, settings builders and
//! re-exports of the mock collaborators used by the test suites.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{SettingsBuilder, TestContext};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let ctx = TestContext::new();
//!     let settings = SettingsBuilder::minimal()
//!         .add_populated_dir_source("data", &[("a.txt", "a")])
//!         .build();
//!     let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::SettingsBuilder;
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use archivist::config::{ArchiveFormat, Defaults, Settings, SourceConfig, VaultConfig};

// Re-export mock implementations from the main crate
pub use archivist::utils::executor::mock::{MockExecutor, MockResponse};
pub use archivist::utils::executor::CommandExecutor;
pub use archivist::vaults::mock::{
    MockArchiveStore, MockClientFactory, MockObjectStore, MockStoreResponse,
};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
