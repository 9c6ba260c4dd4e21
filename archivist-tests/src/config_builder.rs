//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test settings with sensible defaults.

use archivist::config::{ArchiveFormat, Defaults, Settings, SourceConfig, VaultConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test settings
pub struct SettingsBuilder {
    temp_dir: TempDir,
    defaults: Defaults,
    backups: Vec<SourceConfig>,
    vaults: BTreeMap<String, VaultConfig>,
}

impl SettingsBuilder {
    /// Create a builder whose staging root lives in a fresh temp directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let defaults = Defaults {
            tmpdir: temp_dir.path().join("staging"),
            ..Defaults::default()
        };

        Self {
            temp_dir,
            defaults,
            backups: Vec::new(),
            vaults: BTreeMap::new(),
        }
    }

    /// One S3 vault named `offsite`, no sources
    pub fn minimal() -> Self {
        Self::new().add_s3_vault("offsite", "test-bucket")
    }

    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.defaults.format = format;
        self
    }

    pub fn with_keep_archives(mut self, keep: bool) -> Self {
        self.defaults.keep_archives = keep;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.defaults.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_tmpdir(mut self, path: &Path) -> Self {
        self.defaults.tmpdir = path.to_path_buf();
        self
    }

    /// Add a directory source with the given name pattern
    pub fn add_dir_source(mut self, path: &Path, name: &str) -> Self {
        self.backups.push(SourceConfig {
            kind: Some("dir".to_string()),
            path: Some(path.to_path_buf()),
            name: name.to_string(),
            ..SourceConfig::default()
        });
        self
    }

    /// Create `<temp>/<dir_name>` holding `files` and add it as a source
    pub fn add_populated_dir_source(self, dir_name: &str, files: &[(&str, &str)]) -> Self {
        let path = self.temp_dir.path().join(dir_name);
        fs::create_dir_all(&path).expect("Failed to create source directory");
        for (name, content) in files {
            let file = path.join(name);
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent directory");
            }
            fs::write(&file, content).expect("Failed to write source file");
        }
        let pattern = format!("{}-{{yyyy}}{{mm}}{{dd}}-", dir_name);
        self.add_dir_source(&path, &pattern)
    }

    /// Add a database source
    pub fn add_database_source(mut self, url: &str, name: &str) -> Self {
        self.backups.push(SourceConfig {
            kind: Some("database".to_string()),
            url: Some(url.to_string()),
            name: name.to_string(),
            ..SourceConfig::default()
        });
        self
    }

    /// Add a raw source entry
    pub fn add_source(mut self, source: SourceConfig) -> Self {
        self.backups.push(source);
        self
    }

    pub fn add_s3_vault(mut self, name: &str, bucket: &str) -> Self {
        self.vaults.insert(
            name.to_string(),
            VaultConfig {
                service: Some("s3".to_string()),
                region: Some("us-east-1".to_string()),
                name: Some(bucket.to_string()),
                ..VaultConfig::default()
            },
        );
        self
    }

    pub fn add_glacier_vault(mut self, name: &str, vault: &str) -> Self {
        self.vaults.insert(
            name.to_string(),
            VaultConfig {
                service: Some("glacier".to_string()),
                region: Some("us-east-1".to_string()),
                name: Some(vault.to_string()),
                ..VaultConfig::default()
            },
        );
        self
    }

    /// Add a raw vault entry
    pub fn add_vault(mut self, name: &str, vault: VaultConfig) -> Self {
        self.vaults.insert(name.to_string(), vault);
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Staging root the settings point at
    pub fn tmpdir(&self) -> PathBuf {
        self.defaults.tmpdir.clone()
    }

    /// Build the settings; the temp directory is deleted when the builder drops
    pub fn build(self) -> Settings {
        self.persist().0
    }

    /// Build the settings and keep the temp directory alive with the caller
    pub fn persist(self) -> (Settings, TempDir) {
        let settings = Settings {
            defaults: self.defaults,
            backups: self.backups,
            vaults: self.vaults,
        };
        (settings, self.temp_dir)
    }

    /// Write the settings as YAML to `<temp>/backup.yml`
    pub fn write_yaml(self) -> (PathBuf, Settings, TempDir) {
        let (settings, temp_dir) = self.persist();
        let path = temp_dir.path().join("backup.yml");
        let yaml = serde_yml::to_string(&settings).expect("Failed to serialize settings");
        fs::write(&path, yaml).expect("Failed to write config file");
        (path, settings, temp_dir)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
