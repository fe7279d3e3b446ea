//! Reconciler configuration

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use l2net_core::vlan::MAX_VLAN_NAME_LEN;
use l2net_core::{VlanRange, DEFAULT_VLAN_NAME_PREFIX};
use l2net_shared_types::{Credentials, DeviceConnection, TransportKind, VLAN_ID_MAX, VLAN_ID_MIN};

/// Prefix of environment overrides, e.g. `L2NET_SWITCH__HOST`
pub const ENV_PREFIX: &str = "L2NET";

/// Locations searched when no file is given explicitly
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["/etc/l2net/l2net.toml", "./l2net.toml"];

/// Switch port names such as `Gi1/0/48`, `Ethernet1/1` or `xe-0/0/1`
const PORT_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_./:-]*$";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorSettings {
    pub vlan_min: u16,
    pub vlan_max: u16,
    pub vlan_name_prefix: String,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            vlan_min: VLAN_ID_MIN,
            vlan_max: VLAN_ID_MAX,
            vlan_name_prefix: DEFAULT_VLAN_NAME_PREFIX.to_string(),
        }
    }
}

/// The managed switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchSettings {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub transport: TransportKind,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    /// Uplink ports that trunk every tenant VLAN
    pub trunk_ports: Vec<String>,
}

impl Default for SwitchSettings {
    fn default() -> Self {
        Self {
            name: "switch".to_string(),
            host: "127.0.0.1".to_string(),
            port: 23,
            transport: TransportKind::RawSocket,
            username: None,
            password: None,
            use_tls: false,
            trunk_ports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 2,
            backoff_ms: 200,
        }
    }
}

impl DriverSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON state file; the store is kept in memory when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub allocator: AllocatorSettings,
    pub switch: SwitchSettings,
    pub driver: DriverSettings,
    pub store: StoreSettings,
}

impl ReconcilerConfig {
    /// Load a TOML file and apply `L2NET_*` environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::build(Some(path.as_ref()), environment(None))
    }

    /// Load the first file found in the default locations, or defaults plus
    /// environment overrides when there is none
    pub fn load_with_defaults() -> Result<Self, ConfigError> {
        for path in DEFAULT_CONFIG_PATHS {
            if Path::new(path).exists() {
                log::info!("Loading configuration from {}", path);
                return Self::load_from_file(path);
            }
        }

        log::debug!("No configuration file found, using defaults");
        Self::build(None, environment(None))
    }

    fn build(path: Option<&Path>, env: config::Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder.add_source(env).build()?;
        let config: ReconcilerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vlan_range()?;

        let prefix = &self.allocator.vlan_name_prefix;
        if prefix.len() >= MAX_VLAN_NAME_LEN || prefix.chars().any(|c| c.is_whitespace()) {
            return Err(ConfigError::Invalid(format!(
                "vlan_name_prefix '{}' is not usable in a VLAN name",
                prefix
            )));
        }

        if self.switch.host.trim().is_empty() {
            return Err(ConfigError::Invalid("switch.host is empty".to_string()));
        }
        if self.switch.port == 0 {
            return Err(ConfigError::Invalid("switch.port is 0".to_string()));
        }
        if self.switch.transport == TransportKind::Session && self.switch.username.is_none() {
            return Err(ConfigError::Invalid(
                "session transport requires switch.username".to_string(),
            ));
        }
        let port_name = Regex::new(PORT_NAME_PATTERN)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        for port in &self.switch.trunk_ports {
            if !port_name.is_match(port) {
                return Err(ConfigError::Invalid(format!(
                    "invalid trunk port {:?}",
                    port
                )));
            }
        }

        if self.driver.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "driver.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn vlan_range(&self) -> Result<VlanRange, ConfigError> {
        VlanRange::new(self.allocator.vlan_min, self.allocator.vlan_max)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn device_connection(&self) -> DeviceConnection {
        DeviceConnection {
            name: self.switch.name.clone(),
            host: self.switch.host.clone(),
            port: self.switch.port,
            transport: self.switch.transport,
            credentials: self.switch.username.as_ref().map(|username| Credentials {
                username: username.clone(),
                password: self.switch.password.clone(),
            }),
            use_tls: self.switch.use_tls,
        }
    }

    /// TOML rendering with the switch password masked
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.switch.password.is_some() {
            shown.switch.password = Some("********".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

/// Environment source; `vars` replaces the process environment in tests
pub(crate) fn environment(vars: Option<HashMap<String, String>>) -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("switch.trunk_ports")
        .source(vars)
}

#[cfg(test)]
pub(crate) fn load_with_env(
    path: Option<&Path>,
    vars: HashMap<String, String>,
) -> Result<ReconcilerConfig, ConfigError> {
    ReconcilerConfig::build(path, environment(Some(vars)))
}
