//! Remote vaults receiving finished archives
//!
//! Vault kinds form a closed set chosen by the `service` key. Each vault owns
//! a storage client created once through a [`ClientFactory`], so the upload
//! logic never talks to an SDK directly and tests can inject
//! [`mock::MockClientFactory`].

pub mod aws;
pub mod glacier;
pub mod mock;
pub mod s3;

use crate::config::VaultConfig;
use anyhow::Result;
use async_trait::async_trait;
use glacier::ColdStorageVault;
use s3::ObjectStorageVault;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Unknown vault service `{service}` for vault `{vault}`")]
    UnknownService { vault: String, service: String },

    #[error("Key `service` is missing for vault `{vault}`")]
    MissingService { vault: String },

    #[error("Key `name` is missing for vault `{vault}`")]
    MissingName { vault: String },

    #[error("Failed to create storage client for vault `{vault}`: {reason}")]
    Client { vault: String, reason: String },
}

/// What a remote store answered to an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored; metadata such as archive id or object key
    Uploaded(BTreeMap<String, String>),
    /// The store accepted the request but returned no confirmation
    Rejected,
}

impl UploadOutcome {
    pub fn uploaded<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        UploadOutcome::Uploaded(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded(_))
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            UploadOutcome::Uploaded(metadata) => Some(metadata),
            UploadOutcome::Rejected => None,
        }
    }
}

/// Capability shared by every vault kind
#[async_trait]
pub trait Vault: Send + Sync {
    /// Configuration key of the vault
    fn name(&self) -> &str;

    fn describe(&self) -> String;

    async fn upload(&self, archive_path: &Path) -> Result<UploadOutcome>;
}

/// Connection settings handed to a [`ClientFactory`]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsSettings {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
            endpoint_url: config.endpoint_url.clone(),
        }
    }

    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for AwsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Object written by an [`ObjectStoreClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub e_tag: Option<String>,
}

/// Bucket-style storage (S3 and compatible services)
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Store `body` privately under `key`; `None` when the store did not confirm
    async fn put_object(&self, bucket: &str, key: &str, body: &Path) -> Result<Option<StoredObject>>;
}

/// Archive-style cold storage (Glacier)
#[async_trait]
pub trait ArchiveStoreClient: Send + Sync {
    /// Upload `body` as one archive; returns the archive id when assigned
    async fn upload_archive(
        &self,
        account: &str,
        vault: &str,
        description: &str,
        body: &Path,
    ) -> Result<Option<String>>;
}

/// Creates storage clients, once per vault
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn object_store(&self, settings: &AwsSettings) -> Result<Arc<dyn ObjectStoreClient>>;

    async fn archive_store(&self, settings: &AwsSettings) -> Result<Arc<dyn ArchiveStoreClient>>;
}

/// Every supported vault kind
#[derive(Debug)]
pub enum BackupVault {
    ColdStorage(ColdStorageVault),
    ObjectStorage(ObjectStorageVault),
}

impl BackupVault {
    /// Route a vault entry to its implementation and create its client
    pub async fn from_config(
        name: &str,
        config: &VaultConfig,
        clients: &dyn ClientFactory,
    ) -> Result<Self, VaultError> {
        let service = config
            .service
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VaultError::MissingService {
                vault: name.to_string(),
            })?;

        match service {
            "glacier" => ColdStorageVault::new(name, config, clients)
                .await
                .map(BackupVault::ColdStorage),
            "s3" => ObjectStorageVault::new(name, config, clients)
                .await
                .map(BackupVault::ObjectStorage),
            other => Err(VaultError::UnknownService {
                vault: name.to_string(),
                service: other.to_string(),
            }),
        }
    }

    /// Short variant name for listings
    pub fn kind(&self) -> &'static str {
        match self {
            BackupVault::ColdStorage(_) => "glacier",
            BackupVault::ObjectStorage(_) => "s3",
        }
    }

    fn inner(&self) -> &dyn Vault {
        match self {
            BackupVault::ColdStorage(v) => v,
            BackupVault::ObjectStorage(v) => v,
        }
    }
}

#[async_trait]
impl Vault for BackupVault {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn describe(&self) -> String {
        self.inner().describe()
    }

    async fn upload(&self, archive_path: &Path) -> Result<UploadOutcome> {
        self.inner().upload(archive_path).await
    }
}

impl fmt::Display for BackupVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Bucket or vault name, required for both kinds
pub(crate) fn required_name(vault: &str, config: &VaultConfig) -> Result<String, VaultError> {
    config
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| VaultError::MissingName {
            vault: vault.to_string(),
        })
}

/// File name of an archive, used as object key and archive description
pub(crate) fn archive_file_name(archive_path: &Path) -> Result<String> {
    archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("Archive path has no file name: {}", archive_path.display()))
}
