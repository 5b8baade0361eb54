//! Controller orchestration
//!
//! Startup runs strictly in order and any failure aborts it: the admission
//! server never listens unless the webhook configuration carrying its CA is
//! registered.

use std::path::Path;
use std::sync::Arc;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::admin::start_admin_server;
use crate::common::{Result, WebhookError};
use crate::config::Settings;
use crate::registrar::WebhookRegistrar;
use crate::server::{AdmissionHandler, AdmissionServer};
use crate::tls::{cert_fingerprint, cert_subject, RootCa};

/// Wires the CA, the registration and the servers together
pub struct Controller {
    settings: Settings,
    registrar: WebhookRegistrar,
    handler: Arc<dyn AdmissionHandler>,
}

impl Controller {
    pub fn new(
        settings: Settings,
        registrar: WebhookRegistrar,
        handler: Arc<dyn AdmissionHandler>,
    ) -> Self {
        Self { settings, registrar, handler }
    }

    /// Start everything, then serve until `shutdown` is cancelled
    ///
    /// Errors before the servers are up are returned. Errors while shutting
    /// down are only logged.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let ca = RootCa::generate(&self.settings.ca_subject)?;
        info!(
            "Generated root CA {} (sha256 {})",
            cert_subject(ca.certificate()),
            cert_fingerprint(ca.certificate())?
        );

        let registered = self.registrar.create(&ca.ca_bundle()?).await?;
        info!("Registered mutating webhook configuration: {}", registered);

        let identity = ca.issue_leaf(&self.settings.webhook_dns_name())?;
        let server = Arc::new(
            AdmissionServer::new(self.settings.addr, &identity, Arc::clone(&self.handler))?
                .with_shutdown_token(shutdown.child_token()),
        );
        let listener = server.bind().await?;

        let mut serving = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve(listener).await }
        });

        let admin_token = shutdown.child_token();
        tokio::spawn({
            let addr = self.settings.metrics_addr;
            let registrar = self.registrar.clone();
            let token = admin_token.clone();
            async move {
                if let Err(e) = start_admin_server(addr, registrar, token).await {
                    error!("Admin server failed: {}", e);
                }
            }
        });

        let stopped_early = tokio::select! {
            _ = shutdown.cancelled() => None,
            finished = &mut serving => Some(finished),
        };

        if let Some(finished) = stopped_early {
            admin_token.cancel();
            return match finished {
                Ok(result) => result,
                Err(e) => Err(WebhookError::Transport(format!("admission server task failed: {}", e))),
            };
        }

        info!("Shutting down admission server");
        let drained = match self.settings.shutdown_timeout() {
            Some(timeout) => server.shutdown_with_timeout(timeout).await,
            None => server.shutdown().await,
        };

        match drained {
            Ok(()) => match serving.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Admission server stopped with an error: {}", e),
                Err(e) => error!("Admission server task failed: {}", e),
            },
            Err(e) => {
                warn!("Admission server did not drain cleanly: {}", e);
                serving.abort();
            }
        }

        info!("Controller stopped");
        Ok(())
    }
}

/// Client for the cluster API
///
/// Reads `kubeconfig` when given, otherwise infers in-cluster or local
/// configuration the way `kubectl` does.
pub async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let Some(path) = kubeconfig else {
        return Ok(Client::try_default().await?);
    };

    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        WebhookError::Config(format!("failed to read kubeconfig {}: {}", path.display(), e))
    })?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| WebhookError::Config(format!("invalid kubeconfig {}: {}", path.display(), e)))?;

    Ok(Client::try_from(config)?)
}
