//! Archivist Library
//!
//! Extracts databases and directories, packs each into an archive and uploads
//! the archive to every configured cloud vault.

pub mod config;
pub mod managers;
pub mod sources;
pub mod utils;
pub mod vaults;

// Re-export commonly used types
pub use config::{load_validated, ConfigErrors, ConfigFormat, Settings};
pub use managers::backup::{BackupRunner, BuildError, BuildFailure};
pub use managers::context::BackupContext;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::report::{RunReport, SourceOutcome, SourceReport, VaultReport, VaultResult};
pub use sources::{BackupSource, Extraction, Source, SourceError};
pub use vaults::{BackupVault, UploadOutcome, Vault, VaultError};
