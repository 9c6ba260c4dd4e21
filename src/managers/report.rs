//! Outcome of a backup run

use crate::vaults::UploadOutcome;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VaultResult {
    Uploaded { metadata: BTreeMap<String, String> },
    Rejected,
    Failed { error: String },
}

impl From<UploadOutcome> for VaultResult {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Uploaded(metadata) => VaultResult::Uploaded { metadata },
            UploadOutcome::Rejected => VaultResult::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultReport {
    /// Configuration key of the vault
    pub vault: String,
    pub description: String,
    #[serde(flatten)]
    pub result: VaultResult,
}

impl VaultReport {
    pub fn is_uploaded(&self) -> bool {
        matches!(self.result, VaultResult::Uploaded { .. })
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        match &self.result {
            VaultResult::Uploaded { metadata } => Some(metadata),
            _ => None,
        }
    }
}

impl fmt::Display for VaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            VaultResult::Uploaded { metadata } => {
                let fields: Vec<String> = metadata
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "Uploaded to {}: {{{}}}", self.description, fields.join(", "))
            }
            VaultResult::Rejected => write!(f, "Not uploaded to {}", self.description),
            VaultResult::Failed { error } => {
                write!(f, "Not uploaded to {}: {}", self.description, error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Archived {
        archive: PathBuf,
        /// False when the archive was deleted after uploading
        kept: bool,
        uploads: Vec<VaultReport>,
    },
    Empty,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn uploads(&self) -> &[VaultReport] {
        match &self.outcome {
            SourceOutcome::Archived { uploads, .. } => uploads,
            _ => &[],
        }
    }

    pub fn archive(&self) -> Option<&PathBuf> {
        match &self.outcome {
            SourceOutcome::Archived { archive, .. } => Some(archive),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Failed { .. })
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            SourceOutcome::Archived {
                archive, uploads, ..
            } => {
                write!(f, "Archived {}", archive.display())?;
                for upload in uploads {
                    write!(f, "\n{}", upload)?;
                }
                Ok(())
            }
            SourceOutcome::Empty => write!(f, "Nothing to archive from source {}", self.source),
            SourceOutcome::Failed { error } => {
                write!(f, "Failed to archive source {}: {}", self.source, error)
            }
        }
    }
}

/// Per-source results in run order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn archived_count(&self) -> usize {
        self.sources.iter().filter(|s| s.archive().is_some()).count()
    }

    pub fn upload_attempts(&self) -> usize {
        self.sources.iter().map(|s| s.uploads().len()).sum()
    }

    pub fn uploaded_count(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|s| s.uploads())
            .filter(|u| u.is_uploaded())
            .count()
    }

    /// Failed sources plus uploads that did not go through
    pub fn failure_count(&self) -> usize {
        let failed_sources = self.sources.iter().filter(|s| s.is_failed()).count();
        let failed_uploads = self
            .sources
            .iter()
            .flat_map(|s| s.uploads())
            .filter(|u| !u.is_uploaded())
            .count();
        failed_sources + failed_uploads
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for source in &self.sources {
            writeln!(f, "{}", source)?;
        }
        write!(
            f,
            "{} source(s), {} archive(s), {}/{} upload(s) succeeded",
            self.sources.len(),
            self.archived_count(),
            self.uploaded_count(),
            self.upload_attempts()
        )
    }
}
