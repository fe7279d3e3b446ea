//! Reconciliation orchestrator
//!
//! Sequences each logical operation through the allocator, the binding
//! store and the switch driver. The orchestrator keeps no state of its own.
//!
//! Create path: reserve, then bind, then push. Any failure after the
//! reservation is compensated so the call leaves no partial trace.
//!
//! Delete path: detach trunks and delete the VLAN on the device, then
//! release identifiers. Device failures are reported but never keep the
//! model from being cleaned up.

use std::future::Future;
use std::sync::Arc;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use l2net_core::{
    derive_vlan_name, BindingStore, ReconcileError, ResourceStore, Result, VlanRange,
    DEFAULT_VLAN_NAME_PREFIX,
};
use l2net_event_bus::EventBus;
use l2net_segmentation::SegmentationAllocator;
use l2net_shared_types::{
    DeviceOperation, NetworkRecord, NetworkRequest, NetworkUpdate, NetworkView, PortBinding,
    SegmentationReservation, SubnetRecord, SubnetRequest, SubnetUpdate, SubnetView, SystemEvent,
    VlanBinding, VlanId,
};

use crate::invoker::DriverInvoker;
use crate::locks::NetworkLocks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub vlan_name_prefix: String,
    /// Ports that trunk every tenant VLAN from creation on
    pub trunk_ports: Vec<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            vlan_name_prefix: DEFAULT_VLAN_NAME_PREFIX.to_string(),
            trunk_ports: Vec::new(),
        }
    }
}

/// Result of a network deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub network_id: String,
    /// `None` when the network had no binding left
    pub vlan_id: Option<VlanId>,
    pub detached_ports: Vec<String>,
    /// Device failures during cleanup; the model state was released anyway
    pub device_errors: Vec<String>,
}

impl DeleteOutcome {
    pub fn already_deleted(&self) -> bool {
        self.vlan_id.is_none()
    }

    pub fn device_clean(&self) -> bool {
        self.device_errors.is_empty()
    }
}

/// Bindings compared with what the device reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub device: String,
    /// Bound VLANs the device does not have
    pub missing_on_device: Vec<VlanBinding>,
    /// VLANs inside the allocator range the device has but nothing binds
    pub unknown_on_device: Vec<VlanId>,
}

impl AuditReport {
    pub fn in_sync(&self) -> bool {
        self.missing_on_device.is_empty() && self.unknown_on_device.is_empty()
    }
}

/// Device-side progress of a create, used to undo exactly what was done
#[derive(Default)]
struct CreateProgress {
    vlan_pushed: bool,
    enabled_ports: Vec<String>,
}

struct Inner {
    allocator: SegmentationAllocator,
    bindings: Arc<dyn BindingStore>,
    resources: Arc<dyn ResourceStore>,
    invoker: DriverInvoker,
    locks: NetworkLocks,
    events: EventBus,
    settings: OrchestratorSettings,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        allocator: SegmentationAllocator,
        bindings: Arc<dyn BindingStore>,
        resources: Arc<dyn ResourceStore>,
        invoker: DriverInvoker,
        settings: OrchestratorSettings,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                allocator,
                bindings,
                resources,
                invoker,
                locks: NetworkLocks::new(),
                events,
                settings,
            }),
        }
    }

    pub fn vlan_range(&self) -> VlanRange {
        self.inner.allocator.range()
    }

    pub fn device(&self) -> &str {
        self.inner.invoker.device()
    }

    /// Run a mutating operation on its own task so a dropped caller never
    /// interrupts compensation or cleanup
    async fn detached<T, Fut>(&self, operation: Fut) -> Result<T>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        tokio::spawn(operation)
            .await
            .map_err(|e| ReconcileError::Internal {
                message: format!("operation task failed: {}", e),
            })?
    }

    // ---- networks ----

    pub async fn create_network(
        &self,
        tenant_id: &str,
        request: NetworkRequest,
    ) -> Result<NetworkView> {
        request.validate()?;
        let this = self.clone();
        let tenant_id = tenant_id.to_string();
        self.detached(async move { this.create_network_locked(&tenant_id, request).await })
            .await
    }

    async fn create_network_locked(
        &self,
        tenant_id: &str,
        request: NetworkRequest,
    ) -> Result<NetworkView> {
        let inner = &self.inner;
        let network_id = request.id.as_str();
        let _guard = inner.locks.acquire(network_id).await;

        match inner.resources.get_network(network_id).await {
            Ok(_) => {
                return Err(ReconcileError::DuplicateBinding {
                    message: format!("network {} already exists", network_id),
                })
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let vlan_id = inner
            .allocator
            .reserve(tenant_id, network_id, &request.name)
            .await?;
        let vlan_name = derive_vlan_name(&inner.settings.vlan_name_prefix, network_id);

        if let Err(err) = inner
            .bindings
            .add_vlan_binding(vlan_id, &vlan_name, network_id)
            .await
        {
            warn!(
                "Binding network {} to VLAN {} failed: {}",
                network_id, vlan_id, err
            );
            self.release_reservation(vlan_id).await;
            self.report_compensation(network_id, "create_network", &err)
                .await;
            return Err(err);
        }

        let mut progress = CreateProgress::default();
        let pushed = self
            .push_network(vlan_id, &vlan_name, &mut progress)
            .await;
        let persisted = match pushed {
            Ok(()) => {
                let record = NetworkRecord::from_request(tenant_id, &request);
                inner
                    .resources
                    .put_network(record.clone())
                    .await
                    .map(|_| record)
            }
            Err(err) => Err(err),
        };

        let record = match persisted {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    "Creating network {} on VLAN {} failed, rolling back: {}",
                    network_id, vlan_id, err
                );
                self.undo_create(network_id, vlan_id, progress, &err).await;
                return Err(err);
            }
        };

        info!(
            "Created network {} on VLAN {} ({}) for tenant {}",
            network_id, vlan_id, vlan_name, tenant_id
        );
        inner
            .events
            .notify(SystemEvent::NetworkCreated {
                network_id: network_id.to_string(),
                vlan_id,
            })
            .await;

        Ok(NetworkView {
            network: record,
            vlan_id,
            vlan_name,
            ports: progress.enabled_ports,
        })
    }

    async fn push_network(
        &self,
        vlan_id: VlanId,
        vlan_name: &str,
        progress: &mut CreateProgress,
    ) -> Result<()> {
        let inner = &self.inner;

        inner
            .invoker
            .execute(&DeviceOperation::CreateVlan {
                vlan_id,
                vlan_name: vlan_name.to_string(),
            })
            .await?;
        progress.vlan_pushed = true;

        for port in &inner.settings.trunk_ports {
            inner
                .invoker
                .execute(&DeviceOperation::EnableTrunk {
                    port: port.clone(),
                    vlan_id,
                })
                .await?;
            progress.enabled_ports.push(port.clone());
            inner.bindings.add_port_binding(port, vlan_id).await?;
        }

        Ok(())
    }

    /// Undo a create after the binding was written
    async fn undo_create(
        &self,
        network_id: &str,
        vlan_id: VlanId,
        progress: CreateProgress,
        cause: &ReconcileError,
    ) {
        let inner = &self.inner;

        for port in progress.enabled_ports.iter().rev() {
            let op = DeviceOperation::DisableTrunk {
                port: port.clone(),
                vlan_id,
            };
            if let Err(e) = inner.invoker.execute(&op).await {
                error!("Compensation {} failed: {}", op, e);
            }
        }

        // A timed out or unreachable create may still have reached the device
        if progress.vlan_pushed || cause.is_transient() {
            let op = DeviceOperation::DeleteVlan { vlan_id };
            if let Err(e) = inner.invoker.execute(&op).await {
                error!("Compensation {} failed: {}", op, e);
            }
        }

        if let Err(e) = inner.bindings.remove_port_binding(vlan_id).await {
            error!("Failed to drop port bindings of VLAN {}: {}", vlan_id, e);
        }
        if let Err(e) = inner.bindings.remove_vlan_binding(network_id).await {
            error!("Failed to drop binding of network {}: {}", network_id, e);
        }
        self.release_reservation(vlan_id).await;

        self.report_compensation(network_id, "create_network", cause)
            .await;
    }

    async fn release_reservation(&self, vlan_id: VlanId) {
        if let Err(e) = self.inner.allocator.release_vlan(vlan_id).await {
            error!("Failed to release VLAN {}: {}", vlan_id, e);
        }
    }

    async fn report_compensation(&self, network_id: &str, operation: &str, cause: &ReconcileError) {
        self.inner
            .events
            .notify(SystemEvent::CompensationApplied {
                network_id: network_id.to_string(),
                operation: operation.to_string(),
                reason: cause.to_string(),
            })
            .await;
    }

    pub async fn delete_network(&self, tenant_id: &str, network_id: &str) -> Result<DeleteOutcome> {
        let this = self.clone();
        let tenant_id = tenant_id.to_string();
        let network_id = network_id.to_string();
        self.detached(async move { this.delete_network_locked(&tenant_id, &network_id).await })
            .await
    }

    async fn delete_network_locked(
        &self,
        tenant_id: &str,
        network_id: &str,
    ) -> Result<DeleteOutcome> {
        let inner = &self.inner;
        let _guard = inner.locks.acquire(network_id).await;

        let owner = match inner.resources.get_network(network_id).await {
            Ok(record) => Some(record.tenant_id),
            // An interrupted create leaves only the reservation to name the owner
            Err(e) if e.is_not_found() => inner
                .allocator
                .reservation_for(network_id)
                .await
                .map(|r| r.tenant_id),
            Err(e) => return Err(e),
        };
        if owner.is_some_and(|owner| owner != tenant_id) {
            return Err(ReconcileError::NetworkNotFound {
                network_id: network_id.to_string(),
            });
        }

        let binding = match inner.bindings.get_vlan_binding(network_id).await {
            Ok(binding) => binding,
            Err(e) if e.is_not_found() => {
                info!("Network {} has no VLAN binding, already deleted", network_id);
                inner.allocator.release(tenant_id, network_id).await?;
                inner.resources.remove_network(network_id).await?;
                return Ok(DeleteOutcome {
                    network_id: network_id.to_string(),
                    vlan_id: None,
                    detached_ports: Vec::new(),
                    device_errors: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };
        let vlan_id = binding.vlan_id;

        let ports = inner.bindings.remove_port_binding(vlan_id).await?;
        let mut device_errors = Vec::new();

        for port in &ports {
            let op = DeviceOperation::DisableTrunk {
                port: port.port_id.clone(),
                vlan_id,
            };
            if let Err(e) = inner.invoker.execute(&op).await {
                warn!("Device cleanup {} failed: {}", op, e);
                device_errors.push(e.to_string());
            }
        }

        if device_errors.is_empty() {
            let op = DeviceOperation::DeleteVlan { vlan_id };
            if let Err(e) = inner.invoker.execute(&op).await {
                warn!("Device cleanup {} failed: {}", op, e);
                device_errors.push(e.to_string());
            }
        } else {
            warn!(
                "Leaving VLAN {} on {}: trunk removal failed",
                vlan_id,
                inner.invoker.device()
            );
        }

        inner.allocator.release_vlan(vlan_id).await?;
        inner.bindings.remove_vlan_binding(network_id).await?;
        inner.resources.remove_network(network_id).await?;

        if !device_errors.is_empty() {
            inner
                .events
                .notify(SystemEvent::DeviceCleanupFailed {
                    network_id: network_id.to_string(),
                    vlan_id,
                    errors: device_errors.clone(),
                })
                .await;
        }
        inner
            .events
            .notify(SystemEvent::NetworkDeleted {
                network_id: network_id.to_string(),
                vlan_id,
            })
            .await;
        info!("Deleted network {} (VLAN {})", network_id, vlan_id);

        Ok(DeleteOutcome {
            network_id: network_id.to_string(),
            vlan_id: Some(vlan_id),
            detached_ports: ports.into_iter().map(|p| p.port_id).collect(),
            device_errors,
        })
    }

    pub async fn update_network(
        &self,
        network_id: &str,
        update: NetworkUpdate,
    ) -> Result<NetworkView> {
        let _guard = self.inner.locks.acquire(network_id).await;

        let mut record = self.inner.resources.get_network(network_id).await?;
        record.apply(&update)?;
        self.inner.resources.put_network(record.clone()).await?;

        info!("Updated network {}", network_id);
        self.compose_network(record).await
    }

    pub async fn get_network(&self, network_id: &str) -> Result<NetworkView> {
        let record = self.inner.resources.get_network(network_id).await?;
        self.compose_network(record).await
    }

    pub async fn list_networks(&self, tenant_id: Option<&str>) -> Result<Vec<NetworkView>> {
        let records = self.inner.resources.list_networks(tenant_id).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            match self.compose_network(record).await {
                Ok(view) => views.push(view),
                Err(e) if e.is_not_found() => warn!("Skipping network without binding: {}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(views)
    }

    async fn compose_network(&self, record: NetworkRecord) -> Result<NetworkView> {
        let binding = self.inner.bindings.get_vlan_binding(&record.id).await?;
        let ports = self
            .inner
            .bindings
            .list_port_bindings(binding.vlan_id)
            .await?
            .into_iter()
            .map(|p| p.port_id)
            .collect();

        Ok(NetworkView {
            network: record,
            vlan_id: binding.vlan_id,
            vlan_name: binding.vlan_name,
            ports,
        })
    }

    // ---- subnets ----

    pub async fn create_subnet(&self, tenant_id: &str, request: SubnetRequest) -> Result<SubnetView> {
        request.validate()?;
        let _guard = self.inner.locks.acquire(&request.network_id).await;

        let network = self.inner.resources.get_network(&request.network_id).await?;
        if network.tenant_id != tenant_id {
            return Err(ReconcileError::NetworkNotFound {
                network_id: request.network_id.clone(),
            });
        }
        match self.inner.resources.get_subnet(&request.id).await {
            Ok(_) => {
                return Err(ReconcileError::invalid(format!(
                    "subnet {} already exists",
                    request.id
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let binding = self.inner.bindings.get_vlan_binding(&network.id).await?;
        let record = SubnetRecord::from_request(tenant_id, &request);
        self.inner.resources.put_subnet(record.clone()).await?;

        info!(
            "Created subnet {} ({}) on network {}",
            record.id, record.cidr, record.network_id
        );
        Ok(SubnetView {
            subnet: record,
            vlan_id: binding.vlan_id,
        })
    }

    pub async fn update_subnet(&self, subnet_id: &str, update: SubnetUpdate) -> Result<SubnetView> {
        let network_id = self.inner.resources.get_subnet(subnet_id).await?.network_id;
        let _guard = self.inner.locks.acquire(&network_id).await;

        let mut record = self.inner.resources.get_subnet(subnet_id).await?;
        record.apply(&update)?;
        self.inner.resources.put_subnet(record.clone()).await?;

        info!("Updated subnet {}", subnet_id);
        self.compose_subnet(record).await
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<SubnetRecord> {
        let network_id = self.inner.resources.get_subnet(subnet_id).await?.network_id;
        let _guard = self.inner.locks.acquire(&network_id).await;

        let removed = self
            .inner
            .resources
            .remove_subnet(subnet_id)
            .await?
            .ok_or_else(|| ReconcileError::SubnetNotFound {
                subnet_id: subnet_id.to_string(),
            })?;

        info!("Deleted subnet {} of network {}", subnet_id, network_id);
        Ok(removed)
    }

    pub async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetView> {
        let record = self.inner.resources.get_subnet(subnet_id).await?;
        self.compose_subnet(record).await
    }

    pub async fn list_subnets(&self, network_id: Option<&str>) -> Result<Vec<SubnetView>> {
        let records = self.inner.resources.list_subnets(network_id).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(self.compose_subnet(record).await?);
        }
        Ok(views)
    }

    async fn compose_subnet(&self, record: SubnetRecord) -> Result<SubnetView> {
        let binding = self
            .inner
            .bindings
            .get_vlan_binding(&record.network_id)
            .await?;
        Ok(SubnetView {
            subnet: record,
            vlan_id: binding.vlan_id,
        })
    }

    // ---- ports ----

    /// Trunk the network's VLAN on an additional port
    pub async fn attach_port(&self, network_id: &str, port: &str) -> Result<PortBinding> {
        let this = self.clone();
        let network_id = network_id.to_string();
        let port = port.to_string();
        self.detached(async move { this.attach_port_locked(&network_id, &port).await })
            .await
    }

    async fn attach_port_locked(&self, network_id: &str, port: &str) -> Result<PortBinding> {
        let inner = &self.inner;
        let _guard = inner.locks.acquire(network_id).await;

        let vlan_id = inner.bindings.get_vlan_binding(network_id).await?.vlan_id;
        let existing = inner.bindings.list_port_bindings(vlan_id).await?;
        if let Some(binding) = existing.into_iter().find(|b| b.port_id == port) {
            return Ok(binding);
        }

        let enable = DeviceOperation::EnableTrunk {
            port: port.to_string(),
            vlan_id,
        };
        inner.invoker.execute(&enable).await?;

        match inner.bindings.add_port_binding(port, vlan_id).await {
            Ok(binding) => {
                info!("Attached port {} to VLAN {}", port, vlan_id);
                inner
                    .events
                    .notify(SystemEvent::PortAttached {
                        network_id: network_id.to_string(),
                        port: port.to_string(),
                        vlan_id,
                    })
                    .await;
                Ok(binding)
            }
            Err(err) => {
                let disable = DeviceOperation::DisableTrunk {
                    port: port.to_string(),
                    vlan_id,
                };
                if let Err(e) = inner.invoker.execute(&disable).await {
                    error!("Compensation {} failed: {}", disable, e);
                }
                self.report_compensation(network_id, "attach_port", &err)
                    .await;
                Err(err)
            }
        }
    }

    /// Stop trunking the network's VLAN on a port
    pub async fn detach_port(&self, network_id: &str, port: &str) -> Result<PortBinding> {
        let this = self.clone();
        let network_id = network_id.to_string();
        let port = port.to_string();
        self.detached(async move { this.detach_port_locked(&network_id, &port).await })
            .await
    }

    async fn detach_port_locked(&self, network_id: &str, port: &str) -> Result<PortBinding> {
        let inner = &self.inner;
        let _guard = inner.locks.acquire(network_id).await;

        let vlan_id = inner.bindings.get_vlan_binding(network_id).await?.vlan_id;
        let bound = inner
            .bindings
            .list_port_bindings(vlan_id)
            .await?
            .iter()
            .any(|b| b.port_id == port);
        if !bound {
            return Err(ReconcileError::PortBindingNotFound {
                port_id: port.to_string(),
                vlan_id,
            });
        }

        inner
            .invoker
            .execute(&DeviceOperation::DisableTrunk {
                port: port.to_string(),
                vlan_id,
            })
            .await?;
        let binding = inner.bindings.remove_port_from_vlan(port, vlan_id).await?;

        info!("Detached port {} from VLAN {}", port, vlan_id);
        inner
            .events
            .notify(SystemEvent::PortDetached {
                network_id: network_id.to_string(),
                port: port.to_string(),
                vlan_id,
            })
            .await;
        Ok(binding)
    }

    // ---- inspection ----

    pub async fn audit(&self) -> Result<AuditReport> {
        let inner = &self.inner;
        let bindings = inner.bindings.list_vlan_bindings().await?;
        let state = inner.invoker.query_state().await?;
        let range = inner.allocator.range();

        let missing_on_device: Vec<VlanBinding> = bindings
            .iter()
            .filter(|b| !state.has_vlan(b.vlan_id))
            .cloned()
            .collect();
        let unknown_on_device: Vec<VlanId> = state
            .vlan_ids
            .iter()
            .copied()
            .filter(|id| range.contains(*id))
            .filter(|id| !bindings.iter().any(|b| b.vlan_id == *id))
            .collect();

        let report = AuditReport {
            device: inner.invoker.device().to_string(),
            missing_on_device,
            unknown_on_device,
        };
        if !report.in_sync() {
            warn!(
                "Audit of {}: {} bound VLANs missing, {} unknown VLANs",
                report.device,
                report.missing_on_device.len(),
                report.unknown_on_device.len()
            );
        }
        Ok(report)
    }

    pub async fn list_reservations(
        &self,
        tenant_id: Option<&str>,
    ) -> Result<Vec<SegmentationReservation>> {
        self.inner.allocator.list_reservations(tenant_id).await
    }

    pub async fn list_vlan_bindings(&self) -> Result<Vec<VlanBinding>> {
        self.inner.bindings.list_vlan_bindings().await
    }

    pub async fn list_port_bindings(&self) -> Result<Vec<PortBinding>> {
        self.inner.bindings.list_all_port_bindings().await
    }
}
