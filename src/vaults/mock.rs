//! In-memory storage clients for tests
//! Available for use in external test crates

use super::{
    ArchiveStoreClient, AwsSettings, ClientFactory, ObjectStoreClient, StoredObject,
};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// How a mock store answers
#[derive(Clone, Debug, Default)]
pub enum MockStoreResponse {
    #[default]
    Accept,
    /// Answer without confirmation
    Reject,
    /// Fail with the given message
    Fail(String),
}

/// A recorded `put_object` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub body: PathBuf,
}

/// A recorded `upload_archive` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveCall {
    pub account: String,
    pub vault: String,
    pub description: String,
    pub body: PathBuf,
}

#[derive(Clone, Default)]
pub struct MockObjectStore {
    pub calls: Arc<Mutex<Vec<PutCall>>>,
    response: MockStoreResponse,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self::with_response(MockStoreResponse::Reject)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_response(MockStoreResponse::Fail(message.to_string()))
    }

    pub fn with_response(response: MockStoreResponse) -> Self {
        Self {
            calls: Arc::default(),
            response,
        }
    }

    pub fn get_calls(&self) -> Vec<PutCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStoreClient for MockObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: &Path) -> Result<Option<StoredObject>> {
        self.calls.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.to_path_buf(),
        });

        match &self.response {
            MockStoreResponse::Accept => Ok(Some(StoredObject {
                key: key.to_string(),
                e_tag: Some(format!("\"etag-{}\"", key)),
            })),
            MockStoreResponse::Reject => Ok(None),
            MockStoreResponse::Fail(message) => anyhow::bail!("{}", message),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockArchiveStore {
    pub calls: Arc<Mutex<Vec<ArchiveCall>>>,
    response: MockStoreResponse,
}

impl MockArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self::with_response(MockStoreResponse::Reject)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_response(MockStoreResponse::Fail(message.to_string()))
    }

    pub fn with_response(response: MockStoreResponse) -> Self {
        Self {
            calls: Arc::default(),
            response,
        }
    }

    pub fn get_calls(&self) -> Vec<ArchiveCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveStoreClient for MockArchiveStore {
    async fn upload_archive(
        &self,
        account: &str,
        vault: &str,
        description: &str,
        body: &Path,
    ) -> Result<Option<String>> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(ArchiveCall {
            account: account.to_string(),
            vault: vault.to_string(),
            description: description.to_string(),
            body: body.to_path_buf(),
        });

        match &self.response {
            MockStoreResponse::Accept => Ok(Some(format!("archive-{}", calls.len()))),
            MockStoreResponse::Reject => Ok(None),
            MockStoreResponse::Fail(message) => anyhow::bail!("{}", message),
        }
    }
}

/// Hands out the configured mock stores and records requested settings
///
/// Every vault of one kind built from the same factory shares one store.
#[derive(Clone, Default)]
pub struct MockClientFactory {
    object_store: MockObjectStore,
    archive_store: MockArchiveStore,
    requested: Arc<Mutex<Vec<AwsSettings>>>,
    failure: Option<String>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object_store(mut self, store: MockObjectStore) -> Self {
        self.object_store = store;
        self
    }

    pub fn with_archive_store(mut self, store: MockArchiveStore) -> Self {
        self.archive_store = store;
        self
    }

    /// Make every client creation fail
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn object_store_handle(&self) -> MockObjectStore {
        self.object_store.clone()
    }

    pub fn archive_store_handle(&self) -> MockArchiveStore {
        self.archive_store.clone()
    }

    pub fn requested_settings(&self) -> Vec<AwsSettings> {
        self.requested.lock().unwrap().clone()
    }

    fn record(&self, settings: &AwsSettings) -> Result<()> {
        self.requested.lock().unwrap().push(settings.clone());
        match &self.failure {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn object_store(&self, settings: &AwsSettings) -> Result<Arc<dyn ObjectStoreClient>> {
        self.record(settings)?;
        Ok(Arc::new(self.object_store.clone()))
    }

    async fn archive_store(&self, settings: &AwsSettings) -> Result<Arc<dyn ArchiveStoreClient>> {
        self.record(settings)?;
        Ok(Arc::new(self.archive_store.clone()))
    }
}
