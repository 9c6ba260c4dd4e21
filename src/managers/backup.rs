//! Backup runner - orchestrates extraction, archiving and upload

use super::context::BackupContext;
use super::report::{RunReport, SourceOutcome, SourceReport, VaultReport, VaultResult};
use crate::config::{self, ConfigErrors, ConfigFormat, ConfigIssue, Defaults, Settings};
use crate::sources::{BackupSource, Extraction, Source, SourceEnv, SourceError};
use crate::utils::archive::{Archiver, StagingDir};
use crate::vaults::{BackupVault, Vault, VaultError};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Construction failure of a single source or vault
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// A [`BuildError`] keyed by its location in the configuration
#[derive(Debug)]
pub struct BuildFailure {
    /// `backups[<index>]` or `vaults.<name>`
    pub key: String,
    pub error: BuildError,
}

impl BuildFailure {
    pub fn to_issue(&self) -> ConfigIssue {
        ConfigIssue::new(self.key.clone(), self.error.to_string())
    }
}

/// One configured backup: sources, vaults and shared defaults
#[derive(Debug)]
pub struct BackupRunner {
    defaults: Defaults,
    sources: Vec<BackupSource>,
    vaults: BTreeMap<String, BackupVault>,
    archiver: Archiver,
}

impl BackupRunner {
    /// Build every source and vault, collecting all construction failures
    pub async fn build(settings: Settings, ctx: &BackupContext) -> Result<Self, Vec<BuildFailure>> {
        let env = SourceEnv {
            executor: ctx.executor.clone(),
            clock: ctx.clock.clone(),
            timeout: settings.defaults.timeout_seconds.map(Duration::from_secs),
        };

        let mut failures = Vec::new();

        let mut sources = Vec::with_capacity(settings.backups.len());
        for (index, source_config) in settings.backups.iter().enumerate() {
            match BackupSource::from_config(source_config, &env) {
                Ok(source) => sources.push(source),
                Err(e) => failures.push(BuildFailure {
                    key: format!("backups[{}]", index),
                    error: e.into(),
                }),
            }
        }

        let mut vaults = BTreeMap::new();
        for (name, vault_config) in &settings.vaults {
            match BackupVault::from_config(name, vault_config, ctx.clients.as_ref()).await {
                Ok(vault) => {
                    vaults.insert(name.clone(), vault);
                }
                Err(e) => failures.push(BuildFailure {
                    key: format!("vaults.{}", name),
                    error: e.into(),
                }),
            }
        }

        if !failures.is_empty() {
            return Err(failures);
        }

        let archiver = Archiver::new(&settings.defaults.tmpdir, settings.defaults.format);
        Ok(Self {
            defaults: settings.defaults,
            sources,
            vaults,
            archiver,
        })
    }

    /// Load, validate and build from a configuration file
    ///
    /// Yields either a runner or every problem found, never both.
    pub async fn create_with_config(
        path: &Path,
        format: Option<ConfigFormat>,
        ctx: &BackupContext,
    ) -> Result<Self, ConfigErrors> {
        let settings = config::load_validated(path, format)?;
        Self::build(settings, ctx).await.map_err(|failures| {
            ConfigErrors::new(path, failures.iter().map(BuildFailure::to_issue).collect())
        })
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn sources(&self) -> &[BackupSource] {
        &self.sources
    }

    pub fn vaults(&self) -> &BTreeMap<String, BackupVault> {
        &self.vaults
    }

    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }

    /// Back up every source in order and upload each archive to every vault
    ///
    /// Failures of a single source or upload are recorded in the report. Only
    /// a staging failure aborts the run.
    pub async fn run(&self) -> Result<RunReport> {
        let start_time = Instant::now();
        info!(
            "Starting backup of {} source(s) to {} vault(s)",
            self.sources.len(),
            self.vaults.len()
        );

        let mut report = RunReport::default();
        for source in &self.sources {
            let source_report = self.process_source(source).await?;
            report.sources.push(source_report);
        }

        info!(
            "Backup finished in {:.1}s: {} archive(s), {}/{} upload(s) succeeded",
            start_time.elapsed().as_secs_f64(),
            report.archived_count(),
            report.uploaded_count(),
            report.upload_attempts()
        );
        Ok(report)
    }

    /// Stage, extract, archive and upload one source; the staging directory
    /// is removed on every path
    async fn process_source(&self, source: &BackupSource) -> Result<SourceReport> {
        let description = source.describe();
        info!("Backing up source: {}", description);

        let base_name = match source.base_name() {
            Ok(name) => name,
            Err(e) => {
                error!("Failed to render archive name for {}: {}", description, e);
                return Ok(SourceReport {
                    source: description,
                    outcome: SourceOutcome::Failed {
                        error: e.to_string(),
                    },
                });
            }
        };

        let mut staging = self
            .archiver
            .stage(&base_name)
            .with_context(|| format!("Failed to stage source {}", description))?;

        let outcome = self.archive_and_upload(source, &staging, &base_name).await;

        if let Err(e) = staging.cleanup() {
            warn!(
                "Failed to remove staging directory {}: {}",
                staging.path().display(),
                e
            );
        }

        Ok(SourceReport {
            source: description,
            outcome,
        })
    }

    async fn archive_and_upload(
        &self,
        source: &BackupSource,
        staging: &StagingDir,
        base_name: &str,
    ) -> SourceOutcome {
        match source.copy_data(staging.path(), base_name).await {
            Ok(Extraction::Empty) => {
                info!("Nothing to archive from source {}", source);
                SourceOutcome::Empty
            }
            Ok(Extraction::Data { files }) => {
                debug!("Extracted {} file(s) from {}", files, source);
                match self.pack(staging.path()).await {
                    Ok(archive) => {
                        info!("Archived {}", archive.display());
                        let uploads = self.upload_all(&archive).await;
                        let kept = self.dispose_archive(&archive);
                        SourceOutcome::Archived {
                            archive,
                            kept,
                            uploads,
                        }
                    }
                    Err(e) => {
                        error!("Failed to archive {}: {:#}", source, e);
                        SourceOutcome::Failed {
                            error: format!("{:#}", e),
                        }
                    }
                }
            }
            Err(e) => {
                error!("{}", e);
                SourceOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn pack(&self, staging: &Path) -> Result<PathBuf> {
        let archiver = self.archiver.clone();
        let staging = staging.to_path_buf();
        tokio::task::spawn_blocking(move || archiver.pack(&staging))
            .await
            .context("Archive task panicked")?
    }

    /// Upload to every vault in name order; one failing vault never stops the others
    async fn upload_all(&self, archive: &Path) -> Vec<VaultReport> {
        let mut reports = Vec::with_capacity(self.vaults.len());

        for (name, vault) in &self.vaults {
            let result = match vault.upload(archive).await {
                Ok(outcome) => VaultResult::from(outcome),
                Err(e) => VaultResult::Failed {
                    error: format!("{:#}", e),
                },
            };

            let report = VaultReport {
                vault: name.clone(),
                description: vault.describe(),
                result,
            };
            if report.is_uploaded() {
                info!("{}", report);
            } else {
                warn!("{}", report);
            }
            reports.push(report);
        }

        reports
    }

    /// Delete the archive unless configured to keep it; returns whether it remains
    fn dispose_archive(&self, archive: &Path) -> bool {
        if self.defaults.keep_archives {
            return true;
        }
        match fs::remove_file(archive) {
            Ok(()) => {
                debug!("Removed archive {}", archive.display());
                false
            }
            Err(e) => {
                warn!("Failed to remove archive {}: {}", archive.display(), e);
                archive.exists()
            }
        }
    }
}
