//! Directory source: a recursive copy of a local tree

use super::{Extraction, Source, SourceEnv, SourceError, SourceName};
use crate::config::{expand_tilde, SourceConfig};
use crate::utils::template::TemplateError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug)]
pub struct DirectorySource {
    path: PathBuf,
    name: SourceName,
}

impl DirectorySource {
    pub fn new(config: &SourceConfig, env: &SourceEnv) -> Result<Self, SourceError> {
        let path = config
            .path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SourceError::MissingPath)?;

        Ok(Self {
            path: expand_tilde(path),
            name: SourceName::new(config, env.clock.clone())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Source for DirectorySource {
    fn base_name(&self) -> Result<String, TemplateError> {
        self.name.render()
    }

    async fn copy_data(
        &self,
        staging_dir: &Path,
        _base_name: &str,
    ) -> Result<Extraction, SourceError> {
        info!("Copying {}", self.path.display());

        let source = self.path.clone();
        let destination = staging_dir.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&source, &destination))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|r| r)
            .map_err(|e| SourceError::ExtractionFailed {
                target: self.describe(),
                reason: format!("{:#}", e),
            })?;

        debug!("Copied {} file(s) from {}", copied, self.path.display());
        if copied == 0 {
            Ok(Extraction::Empty)
        } else {
            Ok(Extraction::Data { files: copied })
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Copy every regular file and directory under `source` into `destination`,
/// following symlinks; returns the number of files copied
fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    if !source.is_dir() {
        anyhow::bail!("Not a directory: {}", source.display());
    }

    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("Failed to relativize {}", entry.path().display()))?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = destination.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if !file_type.is_file() {
            // Sockets, FIFOs and devices cannot be copied as data
            debug!("Skipping special file {}", entry.path().display());
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            files += 1;
        }
    }

    Ok(files)
}
