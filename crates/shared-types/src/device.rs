use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;
use crate::vlan::VlanId;

/// Kinds of configuration command a switch driver understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOperationKind {
    CreateVlan,
    DeleteVlan,
    EnableTrunk,
    DisableTrunk,
}

impl DeviceOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOperationKind::CreateVlan => "create_vlan",
            DeviceOperationKind::DeleteVlan => "delete_vlan",
            DeviceOperationKind::EnableTrunk => "enable_trunk",
            DeviceOperationKind::DisableTrunk => "disable_trunk",
        }
    }

    /// Removal commands treat "not found" replies as already done
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            DeviceOperationKind::DeleteVlan | DeviceOperationKind::DisableTrunk
        )
    }
}

impl fmt::Display for DeviceOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single command for one device.
///
/// Operations are built from current binding state right before they are
/// sent and are never stored, so resending one is always safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceOperation {
    CreateVlan { vlan_id: VlanId, vlan_name: String },
    DeleteVlan { vlan_id: VlanId },
    EnableTrunk { port: String, vlan_id: VlanId },
    DisableTrunk { port: String, vlan_id: VlanId },
}

impl DeviceOperation {
    pub fn kind(&self) -> DeviceOperationKind {
        match self {
            DeviceOperation::CreateVlan { .. } => DeviceOperationKind::CreateVlan,
            DeviceOperation::DeleteVlan { .. } => DeviceOperationKind::DeleteVlan,
            DeviceOperation::EnableTrunk { .. } => DeviceOperationKind::EnableTrunk,
            DeviceOperation::DisableTrunk { .. } => DeviceOperationKind::DisableTrunk,
        }
    }

    pub fn vlan_id(&self) -> VlanId {
        match self {
            DeviceOperation::CreateVlan { vlan_id, .. }
            | DeviceOperation::DeleteVlan { vlan_id }
            | DeviceOperation::EnableTrunk { vlan_id, .. }
            | DeviceOperation::DisableTrunk { vlan_id, .. } => *vlan_id,
        }
    }

    pub fn port(&self) -> Option<&str> {
        match self {
            DeviceOperation::EnableTrunk { port, .. } | DeviceOperation::DisableTrunk { port, .. } => {
                Some(port)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DeviceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceOperation::CreateVlan { vlan_id, vlan_name } => {
                write!(f, "create_vlan {} ({})", vlan_id, vlan_name)
            }
            DeviceOperation::DeleteVlan { vlan_id } => write!(f, "delete_vlan {}", vlan_id),
            DeviceOperation::EnableTrunk { port, vlan_id } => {
                write!(f, "enable_trunk {} on {}", vlan_id, port)
            }
            DeviceOperation::DisableTrunk { port, vlan_id } => {
                write!(f, "disable_trunk {} on {}", vlan_id, port)
            }
        }
    }
}

/// How configuration reaches a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Free-form CLI fragments written to a TCP socket
    RawSocket,
    /// Structured edit-config payloads inside an authenticated management session
    Session,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::RawSocket => write!(f, "raw-socket"),
            TransportKind::Session => write!(f, "session"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw-socket" | "raw_socket" | "socket" => Ok(TransportKind::RawSocket),
            "session" | "managed-session" => Ok(TransportKind::Session),
            other => Err(SharedTypeError::Unsupported(format!(
                "transport kind '{}'",
                other
            ))),
        }
    }
}

/// Login material for a switch. Only carried, never managed here.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where and how to reach one managed switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConnection {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub transport: TransportKind,
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub use_tls: bool,
}

impl DeviceConnection {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
