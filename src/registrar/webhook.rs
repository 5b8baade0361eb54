//! Rendering of the webhook configuration resource

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    WebhookClientConfig,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use k8s_openapi::ByteString;
use kube::core::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Label marking control-plane namespaces, which are never injected
pub const CONTROL_PLANE_NAMESPACE_LABEL: &str = "linkerd.io/is-control-plane";

const COMPONENT_LABEL: &str = "linkerd.io/control-plane-component";
const COMPONENT: &str = "proxy-injector";

/// What the API server does when the webhook cannot be reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Admit the object unmodified
    #[default]
    Ignore,
    /// Reject the object
    Fail,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "Ignore"),
            Self::Fail => write!(f, "Fail"),
        }
    }
}

/// Which requests the API server sends to the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRule {
    pub operations: Vec<String>,
    pub api_groups: Vec<String>,
    pub api_versions: Vec<String>,
    pub resources: Vec<String>,
}

impl WebhookRule {
    /// Pod creation in the core API group
    pub fn pod_creation() -> Self {
        Self {
            operations: vec!["CREATE".to_string()],
            api_groups: vec![String::new()],
            api_versions: vec!["v1".to_string()],
            resources: vec!["pods".to_string()],
        }
    }

    fn to_rule(&self) -> RuleWithOperations {
        RuleWithOperations {
            operations: Some(self.operations.clone()),
            api_groups: Some(self.api_groups.clone()),
            api_versions: Some(self.api_versions.clone()),
            resources: Some(self.resources.clone()),
            scope: None,
        }
    }
}

/// Everything about the registration except the CA bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSpec {
    /// Name of the cluster-scoped configuration resource
    pub config_name: String,
    /// Name of the single webhook entry; must be a fully qualified name
    pub webhook_name: String,
    pub service_name: String,
    pub namespace: String,
    pub path: String,
    pub port: i32,
    pub failure_policy: FailurePolicy,
    pub rules: Vec<WebhookRule>,
}

impl WebhookSpec {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            config_name: settings.webhook_config_name.clone(),
            webhook_name: settings.webhook_service.clone(),
            service_name: settings.service_name.clone(),
            namespace: settings.controller_namespace.clone(),
            path: "/".to_string(),
            port: 443,
            failure_policy: settings.failure_policy,
            rules: vec![WebhookRule::pod_creation()],
        }
    }

    /// Build the resource trusting `ca_bundle` (PEM)
    pub fn render(&self, ca_bundle: &[u8]) -> MutatingWebhookConfiguration {
        let webhook = MutatingWebhook {
            name: self.webhook_name.clone(),
            client_config: WebhookClientConfig {
                ca_bundle: Some(ByteString(ca_bundle.to_vec())),
                service: Some(ServiceReference {
                    name: self.service_name.clone(),
                    namespace: self.namespace.clone(),
                    path: Some(self.path.clone()),
                    port: Some(self.port),
                }),
                url: None,
            },
            rules: Some(self.rules.iter().map(WebhookRule::to_rule).collect()),
            failure_policy: Some(self.failure_policy.to_string()),
            namespace_selector: Some(LabelSelector {
                match_expressions: Some(vec![LabelSelectorRequirement {
                    key: CONTROL_PLANE_NAMESPACE_LABEL.to_string(),
                    operator: "DoesNotExist".to_string(),
                    values: None,
                }]),
                match_labels: None,
            }),
            side_effects: "None".to_string(),
            admission_review_versions: vec!["v1".to_string(), "v1beta1".to_string()],
            ..Default::default()
        };

        MutatingWebhookConfiguration {
            metadata: ObjectMeta {
                name: Some(self.config_name.clone()),
                labels: Some(BTreeMap::from([(
                    COMPONENT_LABEL.to_string(),
                    COMPONENT.to_string(),
                )])),
                ..Default::default()
            },
            webhooks: Some(vec![webhook]),
        }
    }
}

/// CA bundle embedded in the first webhook entry of `config`
pub fn ca_bundle_of(config: &MutatingWebhookConfiguration) -> Option<&[u8]> {
    config
        .webhooks
        .as_ref()?
        .first()?
        .client_config
        .ca_bundle
        .as_ref()
        .map(|bundle| bundle.0.as_slice())
}
