//! l2net configuration
//!
//! TOML file plus `L2NET_*` environment overrides, deserialized into
//! [`ReconcilerConfig`].

pub mod settings;


pub use settings::{
    AllocatorSettings, ConfigError, DriverSettings, ReconcilerConfig, StoreSettings,
    SwitchSettings, DEFAULT_CONFIG_PATHS, ENV_PREFIX,
};
