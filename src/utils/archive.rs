//! Staging directories and archive packing

use crate::config::{expand_tilde, ArchiveFormat};
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A uniquely named directory holding one source's extracted data
///
/// The directory is removed by [`StagingDir::cleanup`] or, failing that, when
/// the value is dropped.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    removed: bool,
}

impl StagingDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory tree; a directory that is already gone is fine
    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.removed {
            return Ok(());
        }
        remove_tree(&self.path)?;
        self.removed = true;
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to remove staging directory {:?}: {}", self.path, e);
        }
    }
}

/// Remove a directory tree, tolerating a missing directory
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Creates staging directories under a root and packs them into archives
#[derive(Debug, Clone)]
pub struct Archiver {
    root: PathBuf,
    format: ArchiveFormat,
}

impl Archiver {
    pub fn new(root: &Path, format: ArchiveFormat) -> Self {
        Self {
            root: expand_tilde(root),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Create a fresh directory `<root>/<prefix><random>`, creating the root if absent
    pub fn stage(&self, prefix: &str) -> Result<StagingDir> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create staging root: {}", self.root.display()))?;

        let path = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&self.root)
            .with_context(|| {
                format!("Failed to create staging directory in {}", self.root.display())
            })?
            .keep();

        debug!("Created staging directory {:?}", path);
        Ok(StagingDir {
            path,
            removed: false,
        })
    }

    /// Archive path for a staging directory: the directory path plus the format extension
    pub fn archive_path(&self, staging: &Path) -> PathBuf {
        let mut name = staging.as_os_str().to_os_string();
        name.push(".");
        name.push(self.format.extension());
        PathBuf::from(name)
    }

    /// Pack the whole contents of `staging` into a single archive file next to it
    pub fn pack(&self, staging: &Path) -> Result<PathBuf> {
        if !staging.is_dir() {
            anyhow::bail!("Source for archival is not a directory: {}", staging.display());
        }

        let archive_path = self.archive_path(staging);
        debug!(
            "Creating {} archive from {} to {}",
            self.format,
            staging.display(),
            archive_path.display()
        );

        let result = match self.format {
            ArchiveFormat::Zip => create_zip_archive(staging, &archive_path),
            ArchiveFormat::Tar => create_tar_archive(staging, &archive_path, false),
            ArchiveFormat::Gztar => create_tar_archive(staging, &archive_path, true),
        };

        if result.is_err() {
            if let Err(e) = fs::remove_file(&archive_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to remove partial archive {:?}: {}", archive_path, e);
                }
            }
        }

        result.map(|_| archive_path)
    }
}

/// Archive member name: relative path with `/` separators
fn member_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn create_zip_archive(source_dir: &Path, archive_dest_path: &Path) -> Result<()> {
    let archive_file = File::create(archive_dest_path).with_context(|| {
        format!("Failed to create archive file: {}", archive_dest_path.display())
    })?;
    let mut zip = ZipWriter::new(archive_file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for entry in WalkDir::new(source_dir).follow_links(true).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("Failed to walk directory: {}", source_dir.display()))?;
        let path = entry.path();
        let relative = path.strip_prefix(source_dir).with_context(|| {
            format!(
                "Failed to strip prefix {} from {}",
                source_dir.display(),
                path.display()
            )
        })?;

        // Skip the root directory itself
        if relative.as_os_str().is_empty() {
            continue;
        }

        let name = member_name(relative);
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)
                .with_context(|| format!("Failed to add directory {} to archive", path.display()))?;
        } else {
            zip.start_file(name, options)
                .with_context(|| format!("Failed to add file {} to archive", path.display()))?;
            let mut file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            io::copy(&mut file, &mut zip)
                .with_context(|| format!("Failed to write {} to archive", path.display()))?;
        }
    }

    zip.finish().with_context(|| {
        format!("Failed to finish zip archive: {}", archive_dest_path.display())
    })?;
    Ok(())
}

fn create_tar_archive(source_dir: &Path, archive_dest_path: &Path, gzip: bool) -> Result<()> {
    let archive_file = File::create(archive_dest_path).with_context(|| {
        format!("Failed to create archive file: {}", archive_dest_path.display())
    })?;

    if gzip {
        let encoder = GzEncoder::new(archive_file, Compression::default());
        let encoder = append_tree(tar::Builder::new(encoder), source_dir)?;
        encoder.finish().with_context(|| {
            format!(
                "Failed to finish Gzip encoding for archive: {}",
                archive_dest_path.display()
            )
        })?;
    } else {
        append_tree(tar::Builder::new(archive_file), source_dir)?;
    }

    Ok(())
}

fn append_tree<W: io::Write>(mut builder: tar::Builder<W>, source_dir: &Path) -> Result<W> {
    builder.follow_symlinks(true);
    builder
        .append_dir_all(".", source_dir)
        .with_context(|| format!("Failed to append {} to archive", source_dir.display()))?;
    builder
        .into_inner()
        .context("Failed to finish tar archive")
}
