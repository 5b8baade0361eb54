//! Webhook registration
//!
//! Renders the mutating webhook configuration for this controller and keeps
//! it registered with the cluster API server through a [`WebhookConfigStore`].

mod registration;
mod store;
mod webhook;

pub use registration::{DeleteOutcome, RegisteredWebhook, RegistrationOutcome, WebhookRegistrar};
pub use store::{InMemoryWebhookStore, KubeWebhookStore, StoreError, WebhookConfigStore};
pub use webhook::{ca_bundle_of, FailurePolicy, WebhookRule, WebhookSpec, CONTROL_PLANE_NAMESPACE_LABEL};
