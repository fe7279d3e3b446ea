//! Wiring of the store, allocator, driver and orchestrator for one CLI run

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use l2net_config::ReconcilerConfig;
use l2net_core::SwitchDriver;
use l2net_drivers::DriverFactory;
use l2net_event_bus::{EventBus, LogListener};
use l2net_orchestrator::{DriverInvoker, InvokePolicy, Orchestrator, OrchestratorSettings};
use l2net_segmentation::SegmentationAllocator;
use l2net_store::{Database, DbBindingStore, DbResourceStore};

pub struct AppContext {
    pub config: ReconcilerConfig,
    pub event_bus: EventBus,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    /// Load configuration and build the driver it names
    pub async fn bootstrap(config_path: Option<&Path>) -> Result<Arc<Self>> {
        let config = match config_path {
            Some(path) => ReconcilerConfig::load_from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => ReconcilerConfig::load_with_defaults()?,
        };

        let driver = DriverFactory::new()
            .create(config.device_connection())
            .context("Failed to create switch driver")?;

        Self::with_driver(config, driver).await
    }

    pub async fn with_driver(
        config: ReconcilerConfig,
        driver: Arc<dyn SwitchDriver>,
    ) -> Result<Arc<Self>> {
        let db = match &config.store.path {
            Some(path) => Database::open(path)
                .await
                .with_context(|| format!("Failed to open store {}", path.display()))?,
            None => {
                warn!("No store.path configured, state lasts for this run only");
                Database::in_memory()
            }
        };
        let db = Arc::new(db);

        let allocator = SegmentationAllocator::new(db.clone(), config.vlan_range()?);
        let bindings = Arc::new(DbBindingStore::new(db.clone()));
        let resources = Arc::new(DbResourceStore::new(db));

        let policy = InvokePolicy {
            timeout: config.driver.timeout(),
            max_retries: config.driver.max_retries,
            backoff: config.driver.backoff(),
        };
        info!(
            "Using {:?} driver for {} ({})",
            driver.transport(),
            driver.device(),
            config.device_connection().address()
        );
        let invoker = DriverInvoker::new(driver, policy);

        let event_bus = EventBus::new();
        event_bus.register_listener("log", LogListener).await?;

        let settings = OrchestratorSettings {
            vlan_name_prefix: config.allocator.vlan_name_prefix.clone(),
            trunk_ports: config.switch.trunk_ports.clone(),
        };
        let orchestrator = Orchestrator::new(
            allocator,
            bindings,
            resources,
            invoker,
            settings,
            event_bus.clone(),
        );

        Ok(Arc::new(Self {
            config,
            event_bus,
            orchestrator,
        }))
    }
}
