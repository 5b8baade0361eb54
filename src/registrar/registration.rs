//! Webhook registration lifecycle
//!
//! A fresh root CA is generated on every start, so the registered trust
//! bundle must always be the latest one. `create` therefore replaces an
//! existing resource of the same name instead of failing on it.

use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use kube::Resource;
use log::{debug, info, warn};

use super::store::{StoreError, WebhookConfigStore};
use super::webhook::WebhookSpec;
use crate::common::{Result, WebhookError};

/// How `create` got the resource into place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    /// An object with the same name existed and was overwritten
    Replaced,
}

/// Identifier of the registered resource as reported by the API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredWebhook {
    pub self_link: String,
    pub uid: Option<String>,
    pub resource_version: Option<String>,
    pub outcome: RegistrationOutcome,
}

impl RegisteredWebhook {
    fn from_stored(config: &MutatingWebhookConfiguration, outcome: RegistrationOutcome) -> Self {
        let name = config.metadata.name.as_deref().unwrap_or_default();
        Self {
            self_link: format!(
                "{}/{}",
                MutatingWebhookConfiguration::url_path(&(), None),
                name
            ),
            uid: config.metadata.uid.clone(),
            resource_version: config.metadata.resource_version.clone(),
            outcome,
        }
    }
}

impl fmt::Display for RegisteredWebhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.self_link)?;
        if let Some(uid) = &self.uid {
            write!(f, " (uid {})", uid)?;
        }
        Ok(())
    }
}

/// Result of removing the webhook configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete
    AlreadyAbsent,
    Failed(String),
}

impl DeleteOutcome {
    /// Treat an absent resource as success
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Deleted | Self::AlreadyAbsent => Ok(()),
            Self::Failed(reason) => Err(WebhookError::Registration(reason)),
        }
    }
}

/// Declares, inspects and removes one named webhook configuration
#[derive(Clone)]
pub struct WebhookRegistrar {
    store: Arc<dyn WebhookConfigStore>,
    spec: WebhookSpec,
}

impl WebhookRegistrar {
    pub fn new(store: Arc<dyn WebhookConfigStore>, spec: WebhookSpec) -> Self {
        Self { store, spec }
    }

    pub fn spec(&self) -> &WebhookSpec {
        &self.spec
    }

    /// Register the webhook trusting `ca_bundle`, replacing any previous registration
    pub async fn create(&self, ca_bundle: &[u8]) -> Result<RegisteredWebhook> {
        let desired = self.spec.render(ca_bundle);
        let name = &self.spec.config_name;

        match self.store.create(&desired).await {
            Ok(stored) => {
                debug!("Created webhook configuration {}", name);
                return Ok(RegisteredWebhook::from_stored(&stored, RegistrationOutcome::Created));
            }
            Err(StoreError::AlreadyExists(_)) => {
                info!("Webhook configuration {} already exists, replacing it", name);
            }
            Err(e) => return Err(registration_error("create", name, e)),
        }

        let existing = match self.store.get(name).await {
            Ok(existing) => existing,
            Err(StoreError::NotFound(_)) => {
                // Removed between our create and get
                let stored = self
                    .store
                    .create(&desired)
                    .await
                    .map_err(|e| registration_error("create", name, e))?;
                return Ok(RegisteredWebhook::from_stored(&stored, RegistrationOutcome::Created));
            }
            Err(e) => return Err(registration_error("read", name, e)),
        };

        let mut replacement = desired;
        replacement.metadata.resource_version = existing.metadata.resource_version;

        let stored = self
            .store
            .replace(name, &replacement)
            .await
            .map_err(|e| registration_error("replace", name, e))?;
        Ok(RegisteredWebhook::from_stored(&stored, RegistrationOutcome::Replaced))
    }

    /// Succeeds iff the resource exists; the bundle is not checked
    pub async fn get(&self) -> Result<()> {
        self.store
            .get(&self.spec.config_name)
            .await
            .map(|_| ())
            .map_err(|e| registration_error("read", &self.spec.config_name, e))
    }

    /// Whether the resource exists; API failures other than absence are errors
    pub async fn is_registered(&self) -> Result<bool> {
        match self.store.get(&self.spec.config_name).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(registration_error("read", &self.spec.config_name, e)),
        }
    }

    pub async fn delete(&self) -> DeleteOutcome {
        let name = &self.spec.config_name;
        match self.store.delete(name).await {
            Ok(()) => {
                info!("Deleted webhook configuration {}", name);
                DeleteOutcome::Deleted
            }
            Err(StoreError::NotFound(_)) => {
                debug!("Webhook configuration {} was already absent", name);
                DeleteOutcome::AlreadyAbsent
            }
            Err(e) => {
                warn!("Failed to delete webhook configuration {}: {}", name, e);
                DeleteOutcome::Failed(e.to_string())
            }
        }
    }
}

fn registration_error(action: &str, name: &str, err: StoreError) -> WebhookError {
    WebhookError::Registration(format!(
        "failed to {} webhook configuration {}: {}",
        action, name, err
    ))
}
