//! Default configuration values
//!
//! Single source of truth for defaults shared by serde, clap and tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "PROXY_INJECTOR";

/// Environment variable naming an optional JSON settings file
pub const CONFIG_FILE_ENV: &str = "PROXY_INJECTOR_CONFIG_FILE";

pub const LISTEN_PORT: u16 = 8443;
pub const METRICS_PORT: u16 = 9995;

pub const CONTROLLER_NAMESPACE: &str = "linkerd";
pub const WEBHOOK_SERVICE: &str = "linkerd-proxy-injector.linkerd.io";
pub const SERVICE_NAME: &str = "linkerd-proxy-injector";
pub const WEBHOOK_CONFIG_NAME: &str = "linkerd-proxy-injector-webhook-config";
pub const CA_SUBJECT: &str = "Proxy Injector Mutating Webhook Admission Controller CA";
pub const LOG_LEVEL: &str = "info";

/// Admission listen address
pub fn addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), LISTEN_PORT)
}

/// Admin listen address
pub fn metrics_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), METRICS_PORT)
}

pub fn controller_namespace() -> String {
    CONTROLLER_NAMESPACE.to_string()
}

pub fn webhook_service() -> String {
    WEBHOOK_SERVICE.to_string()
}

pub fn service_name() -> String {
    SERVICE_NAME.to_string()
}

pub fn webhook_config_name() -> String {
    WEBHOOK_CONFIG_NAME.to_string()
}

pub fn ca_subject() -> String {
    CA_SUBJECT.to_string()
}

pub fn log_level() -> String {
    LOG_LEVEL.to_string()
}
