//! Configuration payload templates
//!
//! The only interpretation the drivers apply to a payload is substituting
//! the VLAN id, VLAN name and port reference into these templates.

use serde_json::{json, Value};

use l2net_core::{ReconcileError, Result};
use l2net_shared_types::DeviceOperation;

/// Reject values that would break out of a single configuration line
pub fn check_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.chars().any(|c| c.is_control()) {
        return Err(ReconcileError::invalid(format!(
            "{} {:?} cannot be templated into a device command",
            field, value
        )));
    }
    Ok(())
}

fn check_operation(operation: &DeviceOperation) -> Result<()> {
    match operation {
        DeviceOperation::CreateVlan { vlan_name, .. } => check_token("VLAN name", vlan_name),
        DeviceOperation::DeleteVlan { .. } => Ok(()),
        DeviceOperation::EnableTrunk { port, .. } | DeviceOperation::DisableTrunk { port, .. } => {
            check_token("port", port)
        }
    }
}

/// IOS-style CLI fragment for the raw-socket transport
pub fn cli_fragment(operation: &DeviceOperation) -> Result<String> {
    check_operation(operation)?;

    let body = match operation {
        DeviceOperation::CreateVlan { vlan_id, vlan_name } => {
            format!("vlan {}\n name {}\n", vlan_id, vlan_name)
        }
        DeviceOperation::DeleteVlan { vlan_id } => format!("no vlan {}\n", vlan_id),
        DeviceOperation::EnableTrunk { port, vlan_id } => format!(
            "interface {}\n switchport mode trunk\n switchport trunk allowed vlan add {}\n",
            port, vlan_id
        ),
        DeviceOperation::DisableTrunk { port, vlan_id } => format!(
            "interface {}\n switchport trunk allowed vlan remove {}\n",
            port, vlan_id
        ),
    };

    Ok(format!("configure terminal\n{}end\n", body))
}

pub const SHOW_VLAN_COMMAND: &str = "show vlan brief\n";

/// Structured edit-config payload for the session transport
pub fn edit_config(operation: &DeviceOperation) -> Result<Value> {
    check_operation(operation)?;

    let payload = match operation {
        DeviceOperation::CreateVlan { vlan_id, vlan_name } => json!({
            "operation": "merge",
            "target": "vlan",
            "vlan": { "id": vlan_id.get(), "name": vlan_name },
        }),
        DeviceOperation::DeleteVlan { vlan_id } => json!({
            "operation": "delete",
            "target": "vlan",
            "vlan": { "id": vlan_id.get() },
        }),
        DeviceOperation::EnableTrunk { port, vlan_id } => json!({
            "operation": "merge",
            "target": "interface",
            "interface": {
                "name": port,
                "mode": "trunk",
                "allowed_vlans": { "add": [vlan_id.get()] },
            },
        }),
        DeviceOperation::DisableTrunk { port, vlan_id } => json!({
            "operation": "merge",
            "target": "interface",
            "interface": {
                "name": port,
                "allowed_vlans": { "remove": [vlan_id.get()] },
            },
        }),
    };

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use l2net_shared_types::VlanId;

    #[test]
    fn test_cli_fragments() {
        let vlan_id = VlanId::new(40).unwrap();

        let create = cli_fragment(&DeviceOperation::CreateVlan {
            vlan_id,
            vlan_name: "q-net1".to_string(),
        })
        .unwrap();
        assert_eq!(create, "configure terminal\nvlan 40\n name q-net1\nend\n");

        let trunk = cli_fragment(&DeviceOperation::EnableTrunk {
            port: "Gi1/0/4".to_string(),
            vlan_id,
        })
        .unwrap();
        assert!(trunk.contains("interface Gi1/0/4\n"));
        assert!(trunk.contains("switchport trunk allowed vlan add 40\n"));
    }

    #[test]
    fn test_control_characters_rejected() {
        let err = cli_fragment(&DeviceOperation::EnableTrunk {
            port: "Gi1/0/4\nno vlan 1".to_string(),
            vlan_id: VlanId::new(40).unwrap(),
        })
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidRequest { .. }));
    }

    #[test]
    fn test_edit_config_payload() {
        let payload = edit_config(&DeviceOperation::DisableTrunk {
            port: "Gi1/0/48".to_string(),
            vlan_id: VlanId::new(300).unwrap(),
        })
        .unwrap();
        assert_eq!(payload["target"], "interface");
        assert_eq!(payload["interface"]["allowed_vlans"]["remove"][0], 300);
    }
}
