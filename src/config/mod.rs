//! Configuration module
//!
//! Process settings (loaded once at startup, immutable afterwards) and the
//! control-plane configuration bundle codec.

mod bundle;
mod defaults;
mod error;
mod settings;

pub use bundle::{
    ConfigBundle, ConfigJson, Global, IdentityContext, Image, Install, InstallFlag, LogLevel,
    Port, Proxy, ResourceRequirements, GLOBAL_KEY, INSTALL_KEY, PROXY_KEY,
};
pub use defaults::{CONFIG_FILE_ENV, ENV_PREFIX};
pub use error::ConfigError;
pub use settings::{Settings, SettingsOverrides};
