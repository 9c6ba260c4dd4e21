//! Amazon Glacier vault

use super::{
    archive_file_name, required_name, ArchiveStoreClient, AwsSettings, ClientFactory,
    UploadOutcome, Vault, VaultError,
};
use crate::config::VaultConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Account id meaning "the account owning the credentials"
pub const CURRENT_ACCOUNT: &str = "-";

pub struct ColdStorageVault {
    name: String,
    vault_name: String,
    account: String,
    region: Option<String>,
    client: Arc<dyn ArchiveStoreClient>,
}

impl ColdStorageVault {
    pub async fn new(
        name: &str,
        config: &VaultConfig,
        clients: &dyn ClientFactory,
    ) -> Result<Self, VaultError> {
        let vault_name = required_name(name, config)?;
        let client = clients
            .archive_store(&AwsSettings::from_config(config))
            .await
            .map_err(|e| VaultError::Client {
                vault: name.to_string(),
                reason: format!("{:#}", e),
            })?;

        Ok(Self {
            name: name.to_string(),
            vault_name,
            account: config
                .account
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| CURRENT_ACCOUNT.to_string()),
            region: config.region.clone(),
            client,
        })
    }

    pub fn vault_name(&self) -> &str {
        &self.vault_name
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

#[async_trait]
impl Vault for ColdStorageVault {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!(
            "Amazon Glacier [{}] {}",
            self.region.as_deref().unwrap_or("default region"),
            self.vault_name
        )
    }

    async fn upload(&self, archive_path: &Path) -> Result<UploadOutcome> {
        let description = archive_file_name(archive_path)?;
        debug!(
            "Uploading {} to Glacier vault {} (account {})",
            archive_path.display(),
            self.vault_name,
            self.account
        );

        let archive_id = self
            .client
            .upload_archive(&self.account, &self.vault_name, &description, archive_path)
            .await
            .with_context(|| format!("Failed to upload archive to {}", self.describe()))?;

        Ok(match archive_id {
            Some(id) => {
                info!("Glacier archive {} created in {}", id, self.vault_name);
                UploadOutcome::uploaded([("id", id), ("description", description)])
            }
            None => UploadOutcome::Rejected,
        })
    }
}

impl fmt::Debug for ColdStorageVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColdStorageVault")
            .field("name", &self.name)
            .field("vault_name", &self.vault_name)
            .field("account", &self.account)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
