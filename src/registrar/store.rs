//! Cluster API seam for the webhook configuration resource
//!
//! [`WebhookConfigStore`] is the only way the registrar talks to the cluster,
//! so tests and local runs can swap the API server for
//! [`InMemoryWebhookStore`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Failure of a single cluster API call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The object changed since it was read
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("API error: {0}")]
    Api(String),
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(ae.message),
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                StoreError::AlreadyExists(ae.message)
            }
            kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict(ae.message),
            other => StoreError::Api(other.to_string()),
        }
    }
}

/// CRUD over cluster-scoped `MutatingWebhookConfiguration` objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookConfigStore: Send + Sync {
    /// Create `config`; fails with [`StoreError::AlreadyExists`] if the name is taken
    async fn create(
        &self,
        config: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, StoreError>;

    async fn get(&self, name: &str) -> Result<MutatingWebhookConfiguration, StoreError>;

    /// Replace the object `name`; `config` must carry the current resourceVersion
    async fn replace(
        &self,
        name: &str,
        config: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeWebhookStore {
    api: Api<MutatingWebhookConfiguration>,
}

impl KubeWebhookStore {
    pub fn new(client: Client) -> Self {
        Self { api: Api::all(client) }
    }
}

#[async_trait]
impl WebhookConfigStore for KubeWebhookStore {
    async fn create(
        &self,
        config: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, StoreError> {
        Ok(self.api.create(&PostParams::default(), config).await?)
    }

    async fn get(&self, name: &str) -> Result<MutatingWebhookConfiguration, StoreError> {
        Ok(self.api.get(name).await?)
    }

    async fn replace(
        &self,
        name: &str,
        config: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, StoreError> {
        Ok(self.api.replace(name, &PostParams::default(), config).await?)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}

/// In-process store with API-server-like create/replace semantics
///
/// Assigns uids and monotonically increasing resource versions, rejects
/// duplicate creates and stale replaces.
#[derive(Debug, Default)]
pub struct InMemoryWebhookStore {
    inner: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    objects: BTreeMap<String, MutatingWebhookConfiguration>,
    revision: u64,
}

impl InMemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored copy of `name`, if any
    pub fn snapshot(&self, name: &str) -> Option<MutatingWebhookConfiguration> {
        self.lock().objects.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        // A panic while holding the lock leaves the map itself consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn object_name(config: &MutatingWebhookConfiguration) -> Result<String, StoreError> {
    config
        .metadata
        .name
        .clone()
        .ok_or_else(|| StoreError::Api("metadata.name is required".to_string()))
}

#[async_trait]
impl WebhookConfigStore for InMemoryWebhookStore {
    async fn create(
        &self,
        config: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, StoreError> {
        let name = object_name(config)?;
        let mut state = self.lock();
        if state.objects.contains_key(&name) {
            return Err(StoreError::AlreadyExists(name));
        }

        state.revision += 1;
        let mut stored = config.clone();
        stored.metadata.uid = Some(format!("uid-{}", state.revision));
        stored.metadata.resource_version = Some(state.revision.to_string());
        state.objects.insert(name, stored.clone());
        Ok(stored)
    }

    async fn get(&self, name: &str) -> Result<MutatingWebhookConfiguration, StoreError> {
        self.lock()
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn replace(
        &self,
        name: &str,
        config: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, StoreError> {
        let mut state = self.lock();
        let current = state
            .objects
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        if config.metadata.resource_version != current.metadata.resource_version {
            return Err(StoreError::Conflict(format!(
                "{} has resourceVersion {:?}, update carried {:?}",
                name, current.metadata.resource_version, config.metadata.resource_version
            )));
        }

        let uid = current.metadata.uid.clone();
        state.revision += 1;
        let mut stored = config.clone();
        stored.metadata.uid = uid;
        stored.metadata.resource_version = Some(state.revision.to_string());
        state.objects.insert(name.to_string(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.lock()
            .objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}
