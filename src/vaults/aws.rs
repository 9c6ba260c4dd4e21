//! AWS SDK backed storage clients

use super::{ArchiveStoreClient, AwsSettings, ClientFactory, ObjectStoreClient, StoredObject};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_glacier as glacier;
use aws_sdk_s3 as s3;
use s3::types::ObjectCannedAcl;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Builds SDK clients from vault settings
///
/// Static credentials are used when both halves are configured; otherwise the
/// default provider chain applies (environment, profile, instance role).
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsClientFactory;

impl AwsClientFactory {
    pub fn new() -> Self {
        Self
    }

    async fn sdk_config(&self, settings: &AwsSettings) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some((access_key_id, secret_access_key)) = settings.static_credentials() {
            loader = loader.credentials_provider(s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "Static",
            ));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        debug!("Loading AWS configuration: {:?}", settings);
        loader.load().await
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn object_store(&self, settings: &AwsSettings) -> Result<Arc<dyn ObjectStoreClient>> {
        let sdk_config = self.sdk_config(settings).await;
        let mut builder = s3::config::Builder::from(&sdk_config);
        // Path-style addressing for custom endpoints
        if settings.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        Ok(Arc::new(S3ObjectStore {
            client: s3::Client::from_conf(builder.build()),
        }))
    }

    async fn archive_store(&self, settings: &AwsSettings) -> Result<Arc<dyn ArchiveStoreClient>> {
        let sdk_config = self.sdk_config(settings).await;
        Ok(Arc::new(GlacierArchiveStore {
            client: glacier::Client::new(&sdk_config),
        }))
    }
}

pub struct S3ObjectStore {
    client: s3::Client,
}

#[async_trait]
impl ObjectStoreClient for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: &Path) -> Result<Option<StoredObject>> {
        let stream = s3::primitives::ByteStream::from_path(body)
            .await
            .with_context(|| format!("Failed to read archive: {}", body.display()))?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .body(stream)
            .send()
            .await
            .with_context(|| format!("PutObject to bucket {} with key {} failed", bucket, key))?;

        // An answer without an ETag carries no confirmation of the stored object
        Ok(output.e_tag().map(|e_tag| StoredObject {
            key: key.to_string(),
            e_tag: Some(e_tag.to_string()),
        }))
    }
}

pub struct GlacierArchiveStore {
    client: glacier::Client,
}

#[async_trait]
impl ArchiveStoreClient for GlacierArchiveStore {
    async fn upload_archive(
        &self,
        account: &str,
        vault: &str,
        description: &str,
        body: &Path,
    ) -> Result<Option<String>> {
        let stream = glacier::primitives::ByteStream::from_path(body)
            .await
            .with_context(|| format!("Failed to read archive: {}", body.display()))?;

        let output = self
            .client
            .upload_archive()
            .account_id(account)
            .vault_name(vault)
            .archive_description(description)
            .body(stream)
            .send()
            .await
            .with_context(|| format!("UploadArchive to vault {} failed", vault))?;

        Ok(output.archive_id().map(str::to_string))
    }
}
