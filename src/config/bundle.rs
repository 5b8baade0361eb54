//! Control-plane configuration bundle
//!
//! The control plane publishes its configuration as a key-value map with one
//! JSON document per section (`global`, `proxy`, `install`), usually mounted
//! from a ConfigMap. Decoding ignores unknown fields so that older
//! controllers keep working against newer installs. Encoding always emits
//! every field, defaults included, so a round trip is semantically but not
//! byte-for-byte stable.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, Result};

pub const GLOBAL_KEY: &str = "global";
pub const PROXY_KEY: &str = "proxy";
pub const INSTALL_KEY: &str = "install";

/// All three configuration sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub global: Global,
    pub proxy: Proxy,
    pub install: Install,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Global {
    pub linkerd_namespace: String,
    pub cni_enabled: bool,
    pub version: String,
    pub identity_context: IdentityContext,
    pub auto_inject_context: AutoInjectContext,
    pub omit_webhook_side_effects: bool,
    pub cluster_domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdentityContext {
    pub trust_domain: String,
    pub trust_anchors_pem: String,
    /// Protobuf duration text, e.g. `86400s`
    pub issuance_lifetime: String,
    pub clock_skew_allowance: String,
}

/// Presence marker; auto-injection has no options of its own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoInjectContext {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Proxy {
    pub proxy_image: Image,
    pub proxy_init_image: Image,
    pub control_port: Port,
    pub ignore_inbound_ports: Vec<Port>,
    pub ignore_outbound_ports: Vec<Port>,
    pub inbound_port: Port,
    pub admin_port: Port,
    pub outbound_port: Port,
    pub resource: ResourceRequirements,
    pub proxy_uid: i64,
    pub log_level: LogLevel,
    pub disable_external_profiles: bool,
    pub proxy_version: String,
    pub proxy_init_image_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Image {
    pub image_name: String,
    pub pull_policy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    pub port: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceRequirements {
    pub request_cpu: String,
    pub request_memory: String,
    pub limit_cpu: String,
    pub limit_memory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogLevel {
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Install {
    pub cli_version: String,
    pub flags: Vec<InstallFlag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallFlag {
    pub name: String,
    pub value: String,
}

/// The three encoded sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigJson {
    pub global: String,
    pub proxy: String,
    pub install: String,
}

impl ConfigBundle {
    /// Decode a bundle from a map holding the `global`, `proxy` and `install` keys
    ///
    /// A missing or empty section is an error, as is malformed JSON.
    pub fn from_config_map(map: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            global: decode_section(GLOBAL_KEY, map.get(GLOBAL_KEY))?,
            proxy: decode_section(PROXY_KEY, map.get(PROXY_KEY))?,
            install: decode_section(INSTALL_KEY, map.get(INSTALL_KEY))?,
        })
    }

    /// Encode every section, default-valued fields included
    pub fn to_json(&self) -> Result<ConfigJson> {
        Ok(ConfigJson {
            global: serde_json::to_string(&self.global)?,
            proxy: serde_json::to_string(&self.proxy)?,
            install: serde_json::to_string(&self.install)?,
        })
    }

    /// Encode into the same map shape [`ConfigBundle::from_config_map`] reads
    pub fn to_config_map(&self) -> Result<BTreeMap<String, String>> {
        let json = self.to_json()?;
        Ok(BTreeMap::from([
            (GLOBAL_KEY.to_string(), json.global),
            (PROXY_KEY.to_string(), json.proxy),
            (INSTALL_KEY.to_string(), json.install),
        ]))
    }

    /// Read the global section from a mounted file
    pub fn global_from_file(path: &Path) -> Result<Global> {
        decode_file(GLOBAL_KEY, path)
    }

    /// Read the proxy section from a mounted file
    pub fn proxy_from_file(path: &Path) -> Result<Proxy> {
        decode_file(PROXY_KEY, path)
    }

    /// Read the install section from a mounted file
    pub fn install_from_file(path: &Path) -> Result<Install> {
        decode_file(INSTALL_KEY, path)
    }
}

fn decode_section<T: DeserializeOwned>(section: &str, json: Option<&String>) -> Result<T> {
    let json = match json.map(|s| s.trim()) {
        Some(json) if !json.is_empty() => json,
        _ => {
            return Err(ConfigError::ParseError(format!(
                "{} config is missing or empty",
                section
            )))
        }
    };

    serde_json::from_str(json)
        .map_err(|e| ConfigError::ParseError(format!("{} config: {}", section, e)))
}

fn decode_file<T: DeserializeOwned>(section: &str, path: &Path) -> Result<T> {
    let json = crate::common::read_to_string(path).map_err(|e| match e {
        crate::common::WebhookError::Config(_) => ConfigError::FileNotFound(path.to_path_buf()),
        other => ConfigError::FileReadError(path.to_path_buf(), other.to_string()),
    })?;

    debug!("{} config JSON: {}", path.display(), json);
    decode_section(section, Some(&json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Write;

    fn sample_map() -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                GLOBAL_KEY.to_string(),
                r#"{"linkerdNamespace":"linkerd","cniEnabled":true,"identityContext":{"trustDomain":"cluster.local"},"futureField":{"nested":1}}"#.to_string(),
            ),
            (
                PROXY_KEY.to_string(),
                r#"{"proxyImage":{"imageName":"gcr.io/linkerd-io/proxy","pullPolicy":"IfNotPresent"},"ignoreInboundPorts":[{"port":25}],"proxyUid":2102}"#.to_string(),
            ),
            (
                INSTALL_KEY.to_string(),
                r#"{"cliVersion":"edge-19.4.1","flags":[{"name":"ha","value":"true"}]}"#.to_string(),
            ),
        ])
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let bundle = ConfigBundle::from_config_map(&sample_map()).unwrap();

        assert_eq!(bundle.global.linkerd_namespace, "linkerd");
        assert!(bundle.global.cni_enabled);
        assert_eq!(bundle.global.identity_context.trust_domain, "cluster.local");
        assert_eq!(bundle.proxy.proxy_image.image_name, "gcr.io/linkerd-io/proxy");
        assert_eq!(bundle.proxy.ignore_inbound_ports, vec![Port { port: 25 }]);
        assert_eq!(bundle.proxy.proxy_uid, 2102);
        assert_eq!(bundle.install.flags[0].name, "ha");
    }

    #[test]
    fn test_encode_emits_defaults() {
        let bundle = ConfigBundle::from_config_map(&sample_map()).unwrap();
        let json = bundle.to_json().unwrap();

        let global: Value = serde_json::from_str(&json.global).unwrap();
        assert_eq!(global["omitWebhookSideEffects"], Value::Bool(false));
        assert_eq!(global["clusterDomain"], Value::String(String::new()));
        assert!(global.get("futureField").is_none());

        let proxy: Value = serde_json::from_str(&json.proxy).unwrap();
        assert_eq!(proxy["adminPort"]["port"], Value::from(0));
        assert_eq!(proxy["ignoreOutboundPorts"], Value::Array(vec![]));
    }

    #[test]
    fn test_round_trip_preserves_set_fields() {
        let bundle = ConfigBundle::from_config_map(&sample_map()).unwrap();
        let decoded = ConfigBundle::from_config_map(&bundle.to_config_map().unwrap()).unwrap();

        assert_eq!(decoded, bundle);
    }

    #[test]
    fn test_missing_and_malformed_sections() {
        let mut map = sample_map();
        map.remove(INSTALL_KEY);
        let err = ConfigBundle::from_config_map(&map).unwrap_err();
        assert!(err.to_string().contains("install"));

        let mut map = sample_map();
        map.insert(PROXY_KEY.to_string(), "{not json".to_string());
        let err = ConfigBundle::from_config_map(&map).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("proxy"));
    }

    #[test]
    fn test_sections_from_files() {
        let mut global = tempfile::NamedTempFile::new().unwrap();
        write!(global, r#"{{"linkerdNamespace":"mesh","version":"stable-2.3.0"}}"#).unwrap();

        let parsed = ConfigBundle::global_from_file(global.path()).unwrap();
        assert_eq!(parsed.linkerd_namespace, "mesh");
        assert_eq!(parsed.version, "stable-2.3.0");

        let missing = ConfigBundle::proxy_from_file(Path::new("/nonexistent/proxy"));
        assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));
    }
}
