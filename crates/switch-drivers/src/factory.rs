//! Driver factory
//!
//! Maps each transport kind to a constructor. The table is filled once at
//! startup; picking a driver is a configuration choice.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use l2net_core::{ReconcileError, Result, SwitchDriver};
use l2net_shared_types::{DeviceConnection, TransportKind};

use crate::raw_socket::RawSocketDriver;
use crate::session::SessionDriver;

/// Driver constructor function type
pub type DriverConstructor =
    Box<dyn Fn(DeviceConnection) -> Result<Arc<dyn SwitchDriver>> + Send + Sync>;

pub struct DriverFactory {
    constructors: HashMap<TransportKind, DriverConstructor>,
}

impl DriverFactory {
    /// Factory with the built-in raw-socket and session drivers
    pub fn new() -> Self {
        let mut factory = Self::empty();

        factory.register(
            TransportKind::RawSocket,
            Box::new(|connection| -> Result<Arc<dyn SwitchDriver>> {
                Ok(Arc::new(RawSocketDriver::new(connection)))
            }),
        );
        factory.register(
            TransportKind::Session,
            Box::new(|connection| -> Result<Arc<dyn SwitchDriver>> {
                Ok(Arc::new(SessionDriver::new(connection)?))
            }),
        );

        factory
    }

    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, transport: TransportKind, constructor: DriverConstructor) {
        self.constructors.insert(transport, constructor);
        debug!("Registered switch driver: {}", transport);
    }

    pub fn create(&self, connection: DeviceConnection) -> Result<Arc<dyn SwitchDriver>> {
        let transport = connection.transport;
        let constructor =
            self.constructors
                .get(&transport)
                .ok_or_else(|| ReconcileError::Configuration {
                    message: format!("No driver registered for transport '{}'", transport),
                })?;

        let name = connection.name.clone();
        let driver = constructor(connection)?;
        debug!("Created {} driver for switch '{}'", transport, name);
        Ok(driver)
    }

    pub fn available_transports(&self) -> Vec<TransportKind> {
        self.constructors.keys().copied().collect()
    }
}

impl Default for DriverFactory {
    fn default() -> Self {
        Self::new()
    }
}
