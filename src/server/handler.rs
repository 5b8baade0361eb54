//! Admission decision seam
//!
//! The server only moves admission reviews on and off the wire. What to do
//! with a request is decided by an [`AdmissionHandler`].

use std::fmt;

use async_trait::async_trait;
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use kube::core::DynamicObject;
use log::debug;
use serde::{Deserialize, Serialize};

/// Decides on a single admission request
///
/// Runs on the server's runtime; handlers that look things up in the
/// cluster should await rather than block.
#[async_trait]
pub trait AdmissionHandler: Send + Sync + 'static {
    async fn admit(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse;
}

/// How the proxy's traffic redirection is set up in injected pods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjectionStrategy {
    /// An init container rewrites iptables before the workload starts
    #[default]
    InitContainer,
    /// The CNI plugin has already configured the pod network
    Cni,
}

impl fmt::Display for InjectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitContainer => write!(f, "init-container"),
            Self::Cni => write!(f, "cni"),
        }
    }
}

/// Allows every request unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughHandler {
    strategy: InjectionStrategy,
}

impl PassThroughHandler {
    pub fn new(strategy: InjectionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> InjectionStrategy {
        self.strategy
    }
}

#[async_trait]
impl AdmissionHandler for PassThroughHandler {
    async fn admit(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        debug!(
            "Admitting {:?} {} {}/{} unchanged (strategy {})",
            request.operation,
            request.kind.kind,
            request.namespace.as_deref().unwrap_or("-"),
            request.name,
            self.strategy
        );
        AdmissionResponse::from(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::admission::AdmissionReview;

    fn pod_request() -> AdmissionRequest<DynamicObject> {
        let review: AdmissionReview<DynamicObject> = serde_json::from_str(
            r#"{
                "apiVersion": "admission.k8s.io/v1",
                "kind": "AdmissionReview",
                "request": {
                    "uid": "4b1e7a5c-1d0f-4c3a-9a57-2f0c1b0de3a1",
                    "kind": {"group": "", "version": "v1", "kind": "Pod"},
                    "resource": {"group": "", "version": "v1", "resource": "pods"},
                    "operation": "CREATE",
                    "userInfo": {"username": "system:admin"},
                    "object": {"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web"}}
                }
            }"#,
        )
        .unwrap();
        review.try_into().unwrap()
    }

    #[tokio::test]
    async fn test_pass_through_allows() {
        let handler = PassThroughHandler::new(InjectionStrategy::Cni);
        let response = handler.admit(&pod_request()).await;

        assert!(response.allowed);
        assert_eq!(response.uid, "4b1e7a5c-1d0f-4c3a-9a57-2f0c1b0de3a1");
        assert_eq!(handler.strategy().to_string(), "cni");
    }
}
