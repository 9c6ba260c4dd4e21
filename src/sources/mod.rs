//! Backup sources
//!
//! A source extracts one logical backup target into a staging directory. The
//! set of source kinds is closed: [`BackupSource::from_config`] maps the
//! configured `type` (and, for databases, the URL scheme) to a variant and
//! rejects anything else at construction time.

pub mod database;
pub mod directory;

use crate::config::SourceConfig;
use crate::utils::template::{Clock, NameTemplate, TemplateError};
use crate::utils::CommandExecutor;
use async_trait::async_trait;
use database::{DatabaseUrl, MySqlSource, PostgresSource};
use directory::DirectorySource;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Unsupported source type `{}`", .0.as_deref().unwrap_or("<missing>"))]
    UnsupportedSourceType(Option<String>),

    #[error("Unknown database source scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("Key `url` is missing for database source")]
    MissingUrl,

    #[error("Invalid database URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Database is not defined {0}")]
    MissingDatabaseName(String),

    #[error("Key `path` is missing for directory source")]
    MissingPath,

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Archive name `{0}` must be a single file name")]
    InvalidName(String),

    #[error("Extraction from {target} failed: {reason}")]
    ExtractionFailed { target: String, reason: String },
}

/// Result of a successful extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Data was written to the staging directory
    Data { files: usize },
    /// The source legitimately had nothing to back up
    Empty,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        matches!(self, Extraction::Empty)
    }
}

/// Capability shared by every source kind
#[async_trait]
pub trait Source: Send + Sync {
    /// Render the archive base name; each call reads the clock again
    fn base_name(&self) -> Result<String, TemplateError>;

    /// Extract data into `staging_dir`, naming single-file dumps `base_name`
    async fn copy_data(&self, staging_dir: &Path, base_name: &str)
        -> Result<Extraction, SourceError>;

    /// Human readable identity for logs and reports
    fn describe(&self) -> String;
}

/// Collaborators a source needs at run time
#[derive(Clone)]
pub struct SourceEnv {
    pub executor: Arc<dyn CommandExecutor>,
    pub clock: Arc<dyn Clock>,
    /// Timeout for dump subprocesses
    pub timeout: Option<Duration>,
}

/// Name template plus the clock it renders with
#[derive(Clone)]
pub struct SourceName {
    template: NameTemplate,
    clock: Arc<dyn Clock>,
}

impl SourceName {
    /// Bind a pattern to a clock, rejecting patterns that cannot render
    pub fn new(config: &SourceConfig, clock: Arc<dyn Clock>) -> Result<Self, SourceError> {
        let template = NameTemplate::new(config.name.clone(), config.tags.clone());
        let rendered = template.render_now(clock.as_ref())?;
        // Staging prefix and dump file name both live directly under tmpdir
        if rendered == "." || rendered == ".." || rendered.chars().any(std::path::is_separator) {
            return Err(SourceError::InvalidName(rendered));
        }
        Ok(Self { template, clock })
    }

    pub fn render(&self) -> Result<String, TemplateError> {
        self.template.render_now(self.clock.as_ref())
    }

    pub fn template(&self) -> &NameTemplate {
        &self.template
    }
}

impl fmt::Debug for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceName")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Every supported source kind
#[derive(Debug)]
pub enum BackupSource {
    Postgres(PostgresSource),
    MySql(MySqlSource),
    Directory(DirectorySource),
}

impl BackupSource {
    /// Route a source entry to its implementation
    pub fn from_config(config: &SourceConfig, env: &SourceEnv) -> Result<Self, SourceError> {
        match config.kind.as_deref() {
            Some("database") => {
                let raw_url = config.url.as_deref().ok_or(SourceError::MissingUrl)?;
                let url = DatabaseUrl::parse(raw_url)?;
                match url.scheme.as_str() {
                    "postgres" | "postgresql" => {
                        PostgresSource::new(config, url, env).map(BackupSource::Postgres)
                    }
                    "mysql" => MySqlSource::new(config, url, env).map(BackupSource::MySql),
                    other => Err(SourceError::UnsupportedScheme(other.to_string())),
                }
            }
            Some("dir") => DirectorySource::new(config, env).map(BackupSource::Directory),
            other => Err(SourceError::UnsupportedSourceType(other.map(str::to_string))),
        }
    }

    /// Short variant name for listings
    pub fn kind(&self) -> &'static str {
        match self {
            BackupSource::Postgres(_) => "postgres",
            BackupSource::MySql(_) => "mysql",
            BackupSource::Directory(_) => "dir",
        }
    }

    fn inner(&self) -> &dyn Source {
        match self {
            BackupSource::Postgres(s) => s,
            BackupSource::MySql(s) => s,
            BackupSource::Directory(s) => s,
        }
    }
}

#[async_trait]
impl Source for BackupSource {
    fn base_name(&self) -> Result<String, TemplateError> {
        self.inner().base_name()
    }

    async fn copy_data(
        &self,
        staging_dir: &Path,
        base_name: &str,
    ) -> Result<Extraction, SourceError> {
        self.inner().copy_data(staging_dir, base_name).await
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }
}

impl fmt::Display for BackupSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
