//! Named logical operations with JSON arguments
//!
//! Lets an outer surface (CLI, RPC handler) route a request by name without
//! knowing the orchestrator's method signatures.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use l2net_core::{ReconcileError, Result};
use l2net_shared_types::{NetworkRequest, NetworkUpdate, SubnetRequest, SubnetUpdate};

use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperation {
    CreateNetwork,
    UpdateNetwork,
    DeleteNetwork,
    GetNetwork,
    ListNetworks,
    CreateSubnet,
    UpdateSubnet,
    DeleteSubnet,
    GetSubnet,
    ListSubnets,
    AttachPort,
    DetachPort,
    Audit,
}

impl LogicalOperation {
    pub const ALL: [LogicalOperation; 13] = [
        LogicalOperation::CreateNetwork,
        LogicalOperation::UpdateNetwork,
        LogicalOperation::DeleteNetwork,
        LogicalOperation::GetNetwork,
        LogicalOperation::ListNetworks,
        LogicalOperation::CreateSubnet,
        LogicalOperation::UpdateSubnet,
        LogicalOperation::DeleteSubnet,
        LogicalOperation::GetSubnet,
        LogicalOperation::ListSubnets,
        LogicalOperation::AttachPort,
        LogicalOperation::DetachPort,
        LogicalOperation::Audit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperation::CreateNetwork => "create_network",
            LogicalOperation::UpdateNetwork => "update_network",
            LogicalOperation::DeleteNetwork => "delete_network",
            LogicalOperation::GetNetwork => "get_network",
            LogicalOperation::ListNetworks => "list_networks",
            LogicalOperation::CreateSubnet => "create_subnet",
            LogicalOperation::UpdateSubnet => "update_subnet",
            LogicalOperation::DeleteSubnet => "delete_subnet",
            LogicalOperation::GetSubnet => "get_subnet",
            LogicalOperation::ListSubnets => "list_subnets",
            LogicalOperation::AttachPort => "attach_port",
            LogicalOperation::DetachPort => "detach_port",
            LogicalOperation::Audit => "audit",
        }
    }

    /// Whether the operation changes model or device state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            LogicalOperation::GetNetwork
                | LogicalOperation::ListNetworks
                | LogicalOperation::GetSubnet
                | LogicalOperation::ListSubnets
                | LogicalOperation::Audit
        )
    }
}

impl fmt::Display for LogicalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOperation {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        LogicalOperation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ReconcileError::invalid(format!("unknown operation '{}'", s)))
    }
}

#[derive(Debug, Deserialize)]
struct CreateNetworkArgs {
    tenant_id: String,
    network: NetworkRequest,
}

#[derive(Debug, Deserialize)]
struct UpdateNetworkArgs {
    network_id: String,
    changes: NetworkUpdate,
}

#[derive(Debug, Deserialize)]
struct DeleteNetworkArgs {
    tenant_id: String,
    network_id: String,
}

#[derive(Debug, Deserialize)]
struct NetworkIdArgs {
    network_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListNetworksArgs {
    #[serde(default)]
    tenant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateSubnetArgs {
    tenant_id: String,
    subnet: SubnetRequest,
}

#[derive(Debug, Deserialize)]
struct UpdateSubnetArgs {
    subnet_id: String,
    changes: SubnetUpdate,
}

#[derive(Debug, Deserialize)]
struct SubnetIdArgs {
    subnet_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListSubnetsArgs {
    #[serde(default)]
    network_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortArgs {
    network_id: String,
    port: String,
}

fn parse_args<T: DeserializeOwned>(operation: LogicalOperation, args: Value) -> Result<T> {
    // List operations accept a missing argument object
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ReconcileError::invalid(format!("bad arguments for {}: {}", operation, e)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

impl Orchestrator {
    /// Run a logical operation by name and return its JSON result
    pub async fn dispatch(&self, operation: LogicalOperation, args: Value) -> Result<Value> {
        match operation {
            LogicalOperation::CreateNetwork => {
                let a: CreateNetworkArgs = parse_args(operation, args)?;
                to_value(self.create_network(&a.tenant_id, a.network).await?)
            }
            LogicalOperation::UpdateNetwork => {
                let a: UpdateNetworkArgs = parse_args(operation, args)?;
                to_value(self.update_network(&a.network_id, a.changes).await?)
            }
            LogicalOperation::DeleteNetwork => {
                let a: DeleteNetworkArgs = parse_args(operation, args)?;
                to_value(self.delete_network(&a.tenant_id, &a.network_id).await?)
            }
            LogicalOperation::GetNetwork => {
                let a: NetworkIdArgs = parse_args(operation, args)?;
                to_value(self.get_network(&a.network_id).await?)
            }
            LogicalOperation::ListNetworks => {
                let a: ListNetworksArgs = parse_args(operation, args)?;
                to_value(self.list_networks(a.tenant_id.as_deref()).await?)
            }
            LogicalOperation::CreateSubnet => {
                let a: CreateSubnetArgs = parse_args(operation, args)?;
                to_value(self.create_subnet(&a.tenant_id, a.subnet).await?)
            }
            LogicalOperation::UpdateSubnet => {
                let a: UpdateSubnetArgs = parse_args(operation, args)?;
                to_value(self.update_subnet(&a.subnet_id, a.changes).await?)
            }
            LogicalOperation::DeleteSubnet => {
                let a: SubnetIdArgs = parse_args(operation, args)?;
                to_value(self.delete_subnet(&a.subnet_id).await?)
            }
            LogicalOperation::GetSubnet => {
                let a: SubnetIdArgs = parse_args(operation, args)?;
                to_value(self.get_subnet(&a.subnet_id).await?)
            }
            LogicalOperation::ListSubnets => {
                let a: ListSubnetsArgs = parse_args(operation, args)?;
                to_value(self.list_subnets(a.network_id.as_deref()).await?)
            }
            LogicalOperation::AttachPort => {
                let a: PortArgs = parse_args(operation, args)?;
                to_value(self.attach_port(&a.network_id, &a.port).await?)
            }
            LogicalOperation::DetachPort => {
                let a: PortArgs = parse_args(operation, args)?;
                to_value(self.detach_port(&a.network_id, &a.port).await?)
            }
            LogicalOperation::Audit => to_value(self.audit().await?),
        }
    }
}
