//! Amazon S3 (or S3-compatible) bucket vault

use super::{
    archive_file_name, required_name, AwsSettings, ClientFactory, ObjectStoreClient,
    UploadOutcome, Vault, VaultError,
};
use crate::config::VaultConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ObjectStorageVault {
    name: String,
    bucket: String,
    client: Arc<dyn ObjectStoreClient>,
}

impl ObjectStorageVault {
    pub async fn new(
        name: &str,
        config: &VaultConfig,
        clients: &dyn ClientFactory,
    ) -> Result<Self, VaultError> {
        let bucket = required_name(name, config)?;
        let client = clients
            .object_store(&AwsSettings::from_config(config))
            .await
            .map_err(|e| VaultError::Client {
                vault: name.to_string(),
                reason: format!("{:#}", e),
            })?;

        Ok(Self {
            name: name.to_string(),
            bucket,
            client,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl Vault for ObjectStorageVault {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!("Amazon S3 {}", self.bucket)
    }

    async fn upload(&self, archive_path: &Path) -> Result<UploadOutcome> {
        let key = archive_file_name(archive_path)?;
        debug!(
            "Uploading {} to bucket {} as {}",
            archive_path.display(),
            self.bucket,
            key
        );

        let stored = self
            .client
            .put_object(&self.bucket, &key, archive_path)
            .await
            .with_context(|| format!("Failed to upload {} to {}", key, self.describe()))?;

        Ok(match stored {
            Some(object) => {
                info!("Stored s3://{}/{}", self.bucket, object.key);
                let mut metadata = vec![("key", object.key)];
                if let Some(e_tag) = object.e_tag {
                    metadata.push(("etag", e_tag));
                }
                UploadOutcome::uploaded(metadata)
            }
            None => UploadOutcome::Rejected,
        })
    }
}

impl fmt::Debug for ObjectStorageVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorageVault")
            .field("name", &self.name)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}
