//! Configuration module for archivist
//!
//! Loads the backup configuration from YAML or JSON and checks that the
//! required sections are present before anything is constructed from it.
//!
//! ## Example Usage
//!
//! ```no_run
//! use archivist::config;
//!
//! let settings = config::load_validated("backup.yml", None).map_err(|e| e.to_string())?;
//!
//! for source in &settings.backups {
//!     println!("Source: {:?} ({})", source.kind, source.name);
//! }
//! # Ok::<(), String>(())
//! ```

mod loader;
mod types;

pub use loader::{
    load_settings, load_validated, parse_settings, validate_settings, ConfigError, ConfigErrors,
    ConfigFormat, ConfigIssue, Result,
};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
