use serde::{Deserialize, Serialize};

use crate::vlan::VlanId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemEvent {
    /// VLAN reserved, bound and pushed for a new network
    NetworkCreated { network_id: String, vlan_id: VlanId },
    /// Model state for a network was released
    NetworkDeleted { network_id: String, vlan_id: VlanId },
    /// Device cleanup failed during delete; the device may still carry the VLAN
    DeviceCleanupFailed {
        network_id: String,
        vlan_id: VlanId,
        errors: Vec<String>,
    },
    /// A failed operation was rolled back
    CompensationApplied {
        network_id: String,
        operation: String,
        reason: String,
    },
    PortAttached {
        network_id: String,
        port: String,
        vlan_id: VlanId,
    },
    PortDetached {
        network_id: String,
        port: String,
        vlan_id: VlanId,
    },
}

impl SystemEvent {
    pub fn network_id(&self) -> &str {
        match self {
            SystemEvent::NetworkCreated { network_id, .. }
            | SystemEvent::NetworkDeleted { network_id, .. }
            | SystemEvent::DeviceCleanupFailed { network_id, .. }
            | SystemEvent::CompensationApplied { network_id, .. }
            | SystemEvent::PortAttached { network_id, .. }
            | SystemEvent::PortDetached { network_id, .. } => network_id,
        }
    }
}
