use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vlan::VlanId;

/// Association between a tenant network and the VLAN configured for it.
///
/// Bindings are created once and removed on network deletion; they are
/// never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanBinding {
    pub network_id: String,
    pub vlan_id: VlanId,
    pub vlan_name: String,
    pub created_at: DateTime<Utc>,
}

impl VlanBinding {
    pub fn new(network_id: impl Into<String>, vlan_id: VlanId, vlan_name: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            vlan_id,
            vlan_name: vlan_name.into(),
            created_at: Utc::now(),
        }
    }

    /// Two bindings describe the same association, ignoring timestamps
    pub fn same_values(&self, vlan_id: VlanId, vlan_name: &str, network_id: &str) -> bool {
        self.vlan_id == vlan_id && self.vlan_name == vlan_name && self.network_id == network_id
    }
}

/// A switch port currently trunking a VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub port_id: String,
    pub vlan_id: VlanId,
}

impl PortBinding {
    pub fn new(port_id: impl Into<String>, vlan_id: VlanId) -> Self {
        Self {
            port_id: port_id.into(),
            vlan_id,
        }
    }
}

/// The allocator's claim on a VLAN id for one tenant network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationReservation {
    pub tenant_id: String,
    pub network_id: String,
    pub network_name: String,
    pub vlan_id: VlanId,
    pub reserved_at: DateTime<Utc>,
}
