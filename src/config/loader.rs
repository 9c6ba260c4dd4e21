use super::types::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Serialization format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// `.json` selects JSON, anything else is read as YAML
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            other => Err(format!("unknown config format `{}`", other)),
        }
    }
}

/// A single human readable configuration problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Location in the document, e.g. `backups`, `backups[1]` or `vaults.offsite`
    pub key: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.key, self.message)
        }
    }
}

/// Every problem found in one configuration file
#[derive(Debug, Clone, thiserror::Error)]
#[error("Errors in configuration file `{}`", .path.display())]
pub struct ConfigErrors {
    pub path: PathBuf,
    pub issues: Vec<ConfigIssue>,
}

impl ConfigErrors {
    pub fn new(path: impl Into<PathBuf>, issues: Vec<ConfigIssue>) -> Self {
        Self {
            path: path.into(),
            issues,
        }
    }

    /// Whether any issue was reported for the given key
    pub fn has_key(&self, key: &str) -> bool {
        self.issues.iter().any(|issue| issue.key == key)
    }
}

/// Parse a configuration document
pub fn parse_settings(contents: &str, format: ConfigFormat) -> Result<Settings> {
    let settings = match format {
        ConfigFormat::Yaml => serde_yml::from_str(contents)?,
        ConfigFormat::Json => serde_json::from_str(contents)?,
    };
    Ok(settings)
}

/// Read and parse a configuration file, detecting the format from its extension
/// unless `format` overrides it
pub fn load_settings<P: AsRef<Path>>(path: P, format: Option<ConfigFormat>) -> Result<Settings> {
    let path = path.as_ref();
    let format = format.unwrap_or_else(|| ConfigFormat::detect(path));
    let contents = fs::read_to_string(path)?;
    parse_settings(&contents, format)
}

/// Structural validation, run before any source or vault is constructed
pub fn validate_settings(settings: &Settings) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if settings.backups.is_empty() {
        issues.push(ConfigIssue::new("backups", "Section `backups` is empty"));
    }

    if settings.vaults.is_empty() {
        issues.push(ConfigIssue::new("vaults", "Section `vaults` is empty"));
    }

    issues
}

/// Load a configuration file and validate its structure
pub fn load_validated<P: AsRef<Path>>(
    path: P,
    format: Option<ConfigFormat>,
) -> std::result::Result<Settings, ConfigErrors> {
    let path = path.as_ref();

    let settings = match load_settings(path, format) {
        Ok(settings) => settings,
        Err(ConfigError::ReadError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigErrors::new(
                path,
                vec![ConfigIssue::new("", "No config file found")],
            ));
        }
        Err(e) => {
            return Err(ConfigErrors::new(path, vec![ConfigIssue::new("", e.to_string())]));
        }
    };

    let issues = validate_settings(&settings);
    if !issues.is_empty() {
        return Err(ConfigErrors::new(path, issues));
    }

    Ok(settings)
}
