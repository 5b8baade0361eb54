//! Process settings
//!
//! Settings are resolved once at startup and are immutable afterwards:
//! 1. Default values (lowest priority)
//! 2. JSON settings file, if one is named
//! 3. `PROXY_INJECTOR_*` environment variables
//! 4. Command line arguments (highest priority)

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize};

use super::defaults;
use super::error::{ConfigError, Result};
use crate::common::parse_socket_addr;
use crate::registrar::FailurePolicy;
use crate::server::InjectionStrategy;

/// Controller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the admission server listens on; `:port` binds all interfaces
    #[serde(deserialize_with = "deserialize_addr")]
    pub addr: SocketAddr,

    /// Address the admin listener serves health and readiness on
    #[serde(deserialize_with = "deserialize_addr")]
    pub metrics_addr: SocketAddr,

    /// Path to a kubeconfig; in-cluster configuration is inferred when absent
    pub kubeconfig: Option<PathBuf>,

    /// Namespace the control plane runs in
    pub controller_namespace: String,

    /// Name of the webhook entry inside the configuration resource
    pub webhook_service: String,

    /// Service fronting the admission server pods
    pub service_name: String,

    /// Name of the cluster-scoped webhook configuration resource
    pub webhook_config_name: String,

    /// Use the CNI plugin instead of an init container
    pub no_init_container: bool,

    pub log_level: String,

    /// Subject of the generated root CA
    pub ca_subject: String,

    pub failure_policy: FailurePolicy,

    /// Upper bound for draining the admission server; unbounded when unset
    pub shutdown_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: defaults::addr(),
            metrics_addr: defaults::metrics_addr(),
            kubeconfig: None,
            controller_namespace: defaults::controller_namespace(),
            webhook_service: defaults::webhook_service(),
            service_name: defaults::service_name(),
            webhook_config_name: defaults::webhook_config_name(),
            no_init_container: false,
            log_level: defaults::log_level(),
            ca_subject: defaults::ca_subject(),
            failure_policy: FailurePolicy::default(),
            shutdown_timeout_secs: None,
        }
    }
}

/// Addresses from files and the environment accept the same forms as the CLI
fn deserialize_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let addr = String::deserialize(deserializer)?;
    parse_socket_addr(&addr).map_err(serde::de::Error::custom)
}

/// Values given on the command line; `None` keeps the lower layer's value
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub addr: Option<SocketAddr>,
    pub metrics_addr: Option<SocketAddr>,
    pub kubeconfig: Option<PathBuf>,
    pub controller_namespace: Option<String>,
    pub webhook_service: Option<String>,
    pub no_init_container: Option<bool>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings from the settings file (if any) and the environment
    ///
    /// `config_file` wins over `PROXY_INJECTOR_CONFIG_FILE`. A named file that
    /// does not exist is an error.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let config_path = config_file
            .map(Path::to_path_buf)
            .or_else(|| env::var(defaults::CONFIG_FILE_ENV).ok().map(PathBuf::from));

        let mut builder = Config::builder();

        if let Some(path) = &config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Json));
        }

        builder = builder.add_source(
            Environment::with_prefix(defaults::ENV_PREFIX).try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Apply command line values on top of the loaded settings
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(addr) = overrides.addr {
            self.addr = addr;
        }
        if let Some(metrics_addr) = overrides.metrics_addr {
            self.metrics_addr = metrics_addr;
        }
        if let Some(kubeconfig) = overrides.kubeconfig {
            self.kubeconfig = Some(kubeconfig);
        }
        if let Some(namespace) = overrides.controller_namespace {
            self.controller_namespace = namespace;
        }
        if let Some(webhook_service) = overrides.webhook_service {
            self.webhook_service = webhook_service;
        }
        if let Some(no_init_container) = overrides.no_init_container {
            self.no_init_container = no_init_container;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Reject settings the controller cannot start with
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("controller_namespace", &self.controller_namespace),
            ("webhook_service", &self.webhook_service),
            ("service_name", &self.service_name),
            ("webhook_config_name", &self.webhook_config_name),
            ("ca_subject", &self.ca_subject),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingRequiredValue(name.to_string()));
            }
        }

        if self.shutdown_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "shutdown_timeout_secs".to_string(),
                "must be greater than zero; leave unset for an unbounded drain".to_string(),
            ));
        }

        Ok(())
    }

    /// In-cluster DNS name the server certificate is issued for
    pub fn webhook_dns_name(&self) -> String {
        format!("{}.{}.svc", self.service_name, self.controller_namespace)
    }

    pub fn injection_strategy(&self) -> InjectionStrategy {
        if self.no_init_container {
            InjectionStrategy::Cni
        } else {
            InjectionStrategy::InitContainer
        }
    }

    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_secs.map(Duration::from_secs)
    }

    /// Log the effective settings
    pub fn log(&self) {
        info!("Admission listen address: {}", self.addr);
        info!("Admin listen address: {}", self.metrics_addr);
        info!("Controller namespace: {}", self.controller_namespace);
        info!("Webhook: {} (configuration {})", self.webhook_service, self.webhook_config_name);
        info!("Injection strategy: {}", self.injection_strategy());
        match self.shutdown_timeout() {
            Some(timeout) => info!("Shutdown drain timeout: {:?}", timeout),
            None => debug!("Shutdown drain is unbounded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("PROXY_INJECTOR_") {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_sources() {
        clear_env();
        let settings = Settings::load(None).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.addr.port(), 8443);
        assert_eq!(settings.metrics_addr.port(), 9995);
        assert_eq!(settings.webhook_dns_name(), "linkerd-proxy-injector.linkerd.svc");
        assert_eq!(settings.failure_policy, FailurePolicy::Ignore);
    }

    #[test]
    #[serial]
    fn test_file_then_environment() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"controller_namespace": "mesh", "addr": "127.0.0.1:9443", "failure_policy": "Fail", "unknown": 1}}"#
        )
        .unwrap();

        env::set_var("PROXY_INJECTOR_CONTROLLER_NAMESPACE", "mesh-system");
        env::set_var("PROXY_INJECTOR_NO_INIT_CONTAINER", "true");
        env::set_var("PROXY_INJECTOR_SHUTDOWN_TIMEOUT_SECS", "15");

        let settings = Settings::load(Some(file.path())).unwrap();
        clear_env();

        assert_eq!(settings.addr, "127.0.0.1:9443".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.controller_namespace, "mesh-system");
        assert_eq!(settings.failure_policy, FailurePolicy::Fail);
        assert_eq!(settings.injection_strategy(), InjectionStrategy::Cni);
        assert_eq!(settings.shutdown_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    #[serial]
    fn test_port_shorthand_in_file_and_environment() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"metrics_addr": ":9996"}}"#).unwrap();
        env::set_var("PROXY_INJECTOR_ADDR", ":9443");

        let settings = Settings::load(Some(file.path()));
        clear_env();
        let settings = settings.unwrap();

        assert_eq!(settings.addr.port(), 9443);
        assert!(settings.addr.ip().is_unspecified());
        assert_eq!(settings.metrics_addr.port(), 9996);
        assert!(settings.metrics_addr.ip().is_unspecified());
    }

    #[test]
    #[serial]
    fn test_bad_address_is_rejected() {
        clear_env();
        env::set_var("PROXY_INJECTOR_ADDR", "not-an-address");
        let result = Settings::load(None);
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_missing_settings_file() {
        clear_env();
        let result = Settings::load(Some(Path::new("/nonexistent/settings.json")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = SettingsOverrides {
            controller_namespace: Some("other".to_string()),
            no_init_container: Some(true),
            ..Default::default()
        };
        let settings = Settings::default().with_overrides(overrides);

        assert_eq!(settings.controller_namespace, "other");
        assert!(settings.no_init_container);
        assert_eq!(settings.webhook_service, defaults::WEBHOOK_SERVICE);
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate().is_ok());

        let settings = Settings { controller_namespace: " ".to_string(), ..Settings::default() };
        assert!(matches!(settings.validate(), Err(ConfigError::MissingRequiredValue(_))));

        let settings = Settings { shutdown_timeout_secs: Some(0), ..Settings::default() };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_, _))));
    }
}
