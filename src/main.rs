//! Proxy injector command line entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use proxy_injector::common::{init_logger, parse_socket_addr, shutdown_signal, Result};
use proxy_injector::config::{Settings, SettingsOverrides, CONFIG_FILE_ENV};
use proxy_injector::controller::{kube_client, Controller};
use proxy_injector::registrar::{KubeWebhookStore, WebhookRegistrar, WebhookSpec};
use proxy_injector::server::PassThroughHandler;
use proxy_injector::{APP_NAME, VERSION};

/// Mutating admission webhook that registers itself with the cluster
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// JSON settings file
    #[clap(long, env = CONFIG_FILE_ENV)]
    config_file: Option<PathBuf>,

    /// Address to serve admission reviews on
    #[clap(long)]
    addr: Option<String>,

    /// Address to serve health and readiness on
    #[clap(long)]
    metrics_addr: Option<String>,

    /// Path to kubeconfig
    #[clap(long)]
    kubeconfig: Option<PathBuf>,

    /// Namespace in which the control plane is installed
    #[clap(long)]
    controller_namespace: Option<String>,

    /// Name of the admission webhook
    #[clap(long)]
    webhook_service: Option<String>,

    /// Rely on the CNI plugin instead of an init container
    #[clap(long)]
    no_init_container: bool,

    /// Log level
    #[clap(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Result<SettingsOverrides> {
        Ok(SettingsOverrides {
            addr: self.addr.as_deref().map(parse_socket_addr).transpose()?,
            metrics_addr: self.metrics_addr.as_deref().map(parse_socket_addr).transpose()?,
            kubeconfig: self.kubeconfig.clone(),
            controller_namespace: self.controller_namespace.clone(),
            webhook_service: self.webhook_service.clone(),
            no_init_container: self.no_init_container.then_some(true),
            log_level: self.log_level.clone(),
        })
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        // Settings may have failed before the logger was configured.
        init_logger("info");
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.config_file.as_deref())?.with_overrides(args.overrides()?);
    settings.validate()?;

    init_logger(&settings.log_level);
    info!("Starting {} v{}", APP_NAME, VERSION);
    settings.log();

    let client = kube_client(settings.kubeconfig.as_deref()).await?;
    let registrar = WebhookRegistrar::new(
        Arc::new(KubeWebhookStore::new(client)),
        WebhookSpec::from_settings(&settings),
    );
    let handler = Arc::new(PassThroughHandler::new(settings.injection_strategy()));

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    Controller::new(settings, registrar, handler).run(shutdown).await
}
