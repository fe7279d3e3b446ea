//! Persistence contracts consumed by the orchestrator

use async_trait::async_trait;

use l2net_shared_types::{NetworkRecord, PortBinding, SubnetRecord, VlanBinding, VlanId};

use crate::Result;

/// Durable network ↔ VLAN and port ↔ VLAN bindings.
///
/// Each call is its own transaction: it either commits fully or leaves
/// the store untouched.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Bind a network to a VLAN.
    ///
    /// Re-adding identical values succeeds. Fails with `DuplicateBinding`
    /// when the network is bound to another VLAN or the VLAN to another network.
    async fn add_vlan_binding(
        &self,
        vlan_id: VlanId,
        vlan_name: &str,
        network_id: &str,
    ) -> Result<VlanBinding>;

    /// Returns the removed binding, `None` if there was nothing to remove
    async fn remove_vlan_binding(&self, network_id: &str) -> Result<Option<VlanBinding>>;

    async fn get_vlan_binding(&self, network_id: &str) -> Result<VlanBinding>;

    /// All live bindings ordered by VLAN id
    async fn list_vlan_bindings(&self) -> Result<Vec<VlanBinding>>;

    async fn add_port_binding(&self, port_id: &str, vlan_id: VlanId) -> Result<PortBinding>;

    /// Remove every port bound to `vlan_id` and return them in binding order
    async fn remove_port_binding(&self, vlan_id: VlanId) -> Result<Vec<PortBinding>>;

    async fn remove_port_from_vlan(&self, port_id: &str, vlan_id: VlanId) -> Result<PortBinding>;

    async fn list_port_bindings(&self, vlan_id: VlanId) -> Result<Vec<PortBinding>>;

    async fn list_all_port_bindings(&self) -> Result<Vec<PortBinding>>;
}

/// Tenant-visible network and subnet rows
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn put_network(&self, network: NetworkRecord) -> Result<()>;
    async fn get_network(&self, network_id: &str) -> Result<NetworkRecord>;
    async fn list_networks(&self, tenant_id: Option<&str>) -> Result<Vec<NetworkRecord>>;
    /// Also drops the network's subnets
    async fn remove_network(&self, network_id: &str) -> Result<Option<NetworkRecord>>;

    /// Insert or replace a subnet and link it to its parent network
    async fn put_subnet(&self, subnet: SubnetRecord) -> Result<()>;
    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetRecord>;
    async fn list_subnets(&self, network_id: Option<&str>) -> Result<Vec<SubnetRecord>>;
    async fn remove_subnet(&self, subnet_id: &str) -> Result<Option<SubnetRecord>>;
}
