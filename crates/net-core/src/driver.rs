//! Switch driver abstraction

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use l2net_shared_types::{DeviceOperation, TransportKind, VlanId};

use crate::Result;

/// How the device answered an idempotent command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// The device changed its configuration
    Applied,
    /// The device already had the requested state ("already exists" / "not found")
    AlreadyInState,
}

/// VLANs currently configured on a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub vlan_ids: BTreeSet<VlanId>,
}

impl DeviceState {
    pub fn has_vlan(&self, vlan_id: VlanId) -> bool {
        self.vlan_ids.contains(&vlan_id)
    }
}

/// One family of managed switch.
///
/// Every command must be idempotent at the device and must release its
/// connection on every exit path.
#[async_trait]
pub trait SwitchDriver: Send + Sync {
    fn transport(&self) -> TransportKind;
    fn device(&self) -> &str;

    async fn create_vlan(&self, vlan_id: VlanId, vlan_name: &str) -> Result<DeviceOutcome>;
    async fn delete_vlan(&self, vlan_id: VlanId) -> Result<DeviceOutcome>;
    async fn enable_trunk(&self, port: &str, vlan_id: VlanId) -> Result<DeviceOutcome>;
    async fn disable_trunk(&self, port: &str, vlan_id: VlanId) -> Result<DeviceOutcome>;

    async fn query_state(&self) -> Result<DeviceState>;

    async fn execute(&self, operation: &DeviceOperation) -> Result<DeviceOutcome> {
        match operation {
            DeviceOperation::CreateVlan { vlan_id, vlan_name } => {
                self.create_vlan(*vlan_id, vlan_name).await
            }
            DeviceOperation::DeleteVlan { vlan_id } => self.delete_vlan(*vlan_id).await,
            DeviceOperation::EnableTrunk { port, vlan_id } => {
                self.enable_trunk(port, *vlan_id).await
            }
            DeviceOperation::DisableTrunk { port, vlan_id } => {
                self.disable_trunk(port, *vlan_id).await
            }
        }
    }
}
