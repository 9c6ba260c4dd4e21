use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    /// Backup sources, processed in declaration order
    #[serde(default)]
    pub backups: Vec<SourceConfig>,

    /// Named vaults every archive is uploaded to
    #[serde(default)]
    pub vaults: BTreeMap<String, VaultConfig>,
}

/// Global settings shared by every source and vault
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Root directory for staging directories and archives
    #[serde(default = "default_tmpdir")]
    pub tmpdir: PathBuf,

    /// Archive container format
    #[serde(default)]
    pub format: ArchiveFormat,

    /// Keep archive files in `tmpdir` after they were uploaded
    #[serde(default = "default_keep_archives")]
    pub keep_archives: bool,

    /// Timeout for dump subprocesses
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
    /// Write the file log as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            tmpdir: default_tmpdir(),
            format: ArchiveFormat::default(),
            keep_archives: default_keep_archives(),
            timeout_seconds: None,
            log_directory: None,
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    Tar,
    #[serde(alias = "tar.gz", alias = "tgz")]
    Gztar,
}

impl ArchiveFormat {
    /// File extension appended to the staging directory path
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Gztar => "tar.gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Gztar => "gztar",
        };
        f.write_str(name)
    }
}

/// One entry of the `backups` section (raw, before dispatch)
///
/// `type` stays a plain string so that unknown or missing values surface as
/// construction errors keyed by the entry instead of parse failures.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Connection URL (`type: database`)
    #[serde(default)]
    pub url: Option<String>,

    /// Directory to copy (`type: dir`)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Archive name pattern
    #[serde(default = "default_name_pattern")]
    pub name: String,

    #[serde(default)]
    pub tags: String,
}

/// One entry of the `vaults` section (raw, before dispatch)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Static credentials; the AWS default provider chain is used when absent
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Glacier account id
    #[serde(default)]
    pub account: Option<String>,

    /// Vault or bucket name
    #[serde(default)]
    pub name: Option<String>,

    /// Custom endpoint for S3-compatible storage
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

// Default value functions

fn default_tmpdir() -> PathBuf { std::env::temp_dir().join("archivist") }
fn default_keep_archives() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
pub(crate) fn default_name_pattern() -> String {
    "backup-{yyyy}{mm}{dd}-{HH}{MM}{SS}".to_string()
}
