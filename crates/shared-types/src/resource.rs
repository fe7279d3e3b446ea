use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};
use crate::vlan::VlanId;

fn default_admin_state() -> bool {
    true
}

/// Operational status reported for a tenant network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkStatus {
    Active,
    Down,
    Error,
}

/// Validated network payload handed in by the CRUD layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub id: String,
    pub name: String,
    #[serde(default = "default_admin_state")]
    pub admin_state_up: bool,
}

impl NetworkRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            admin_state_up: true,
        }
    }

    pub fn validate(&self) -> SharedResult<()> {
        if self.id.trim().is_empty() {
            return Err(SharedTypeError::InvalidValue {
                field: "id",
                value: self.id.clone(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(SharedTypeError::InvalidValue {
                field: "name",
                value: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Partial update of the mutable network attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin_state_up: Option<bool>,
}

/// Stored tenant network row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub admin_state_up: bool,
    pub status: NetworkStatus,
    pub subnets: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl NetworkRecord {
    pub fn from_request(tenant_id: impl Into<String>, request: &NetworkRequest) -> Self {
        Self {
            id: request.id.clone(),
            tenant_id: tenant_id.into(),
            name: request.name.clone(),
            admin_state_up: request.admin_state_up,
            status: if request.admin_state_up {
                NetworkStatus::Active
            } else {
                NetworkStatus::Down
            },
            subnets: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: &NetworkUpdate) -> SharedResult<()> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(SharedTypeError::InvalidValue {
                    field: "name",
                    value: name.clone(),
                });
            }
            self.name = name.clone();
        }
        if let Some(admin_state_up) = update.admin_state_up {
            self.admin_state_up = admin_state_up;
            if self.status != NetworkStatus::Error {
                self.status = if admin_state_up {
                    NetworkStatus::Active
                } else {
                    NetworkStatus::Down
                };
            }
        }
        Ok(())
    }
}

/// Network row composed with its device-level VLAN state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkView {
    #[serde(flatten)]
    pub network: NetworkRecord,
    pub vlan_id: VlanId,
    pub vlan_name: String,
    pub ports: Vec<String>,
}

/// An inclusive range of assignable addresses inside a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPool {
    pub start: IpAddr,
    pub end: IpAddr,
}

/// Validated subnet payload handed in by the CRUD layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRequest {
    pub id: String,
    pub network_id: String,
    pub ip_version: u8,
    pub cidr: IpNet,
    #[serde(default)]
    pub gateway_ip: Option<IpAddr>,
    #[serde(default)]
    pub allocation_pools: Vec<AllocationPool>,
}

impl SubnetRequest {
    pub fn validate(&self) -> SharedResult<()> {
        if self.id.trim().is_empty() {
            return Err(SharedTypeError::InvalidValue {
                field: "id",
                value: self.id.clone(),
            });
        }
        validate_subnet_shape(
            self.ip_version,
            &self.cidr,
            self.gateway_ip.as_ref(),
            &self.allocation_pools,
        )
    }
}

fn validate_subnet_shape(
    ip_version: u8,
    cidr: &IpNet,
    gateway_ip: Option<&IpAddr>,
    pools: &[AllocationPool],
) -> SharedResult<()> {
    let family_matches = match (ip_version, cidr) {
        (4, IpNet::V4(_)) | (6, IpNet::V6(_)) => true,
        _ => false,
    };
    if !family_matches {
        return Err(SharedTypeError::InvalidValue {
            field: "ip_version",
            value: format!("{} for {}", ip_version, cidr),
        });
    }

    if let Some(gateway) = gateway_ip {
        if !cidr.contains(gateway) {
            return Err(SharedTypeError::InvalidValue {
                field: "gateway_ip",
                value: format!("{} outside {}", gateway, cidr),
            });
        }
    }

    for pool in pools {
        if !cidr.contains(&pool.start) || !cidr.contains(&pool.end) || pool.start > pool.end {
            return Err(SharedTypeError::InvalidValue {
                field: "allocation_pools",
                value: format!("{}-{}", pool.start, pool.end),
            });
        }
    }

    Ok(())
}

/// Partial update of a subnet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetUpdate {
    #[serde(default)]
    pub ip_version: Option<u8>,
    #[serde(default)]
    pub cidr: Option<IpNet>,
    #[serde(default)]
    pub gateway_ip: Option<IpAddr>,
    #[serde(default)]
    pub allocation_pools: Option<Vec<AllocationPool>>,
}

/// Stored subnet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRecord {
    pub id: String,
    pub network_id: String,
    pub tenant_id: String,
    pub ip_version: u8,
    pub cidr: IpNet,
    pub gateway_ip: Option<IpAddr>,
    pub allocation_pools: Vec<AllocationPool>,
    pub created_at: DateTime<Utc>,
}

impl SubnetRecord {
    pub fn from_request(tenant_id: impl Into<String>, request: &SubnetRequest) -> Self {
        Self {
            id: request.id.clone(),
            network_id: request.network_id.clone(),
            tenant_id: tenant_id.into(),
            ip_version: request.ip_version,
            cidr: request.cidr,
            gateway_ip: request.gateway_ip,
            allocation_pools: request.allocation_pools.clone(),
            created_at: Utc::now(),
        }
    }

    /// Apply an update, leaving the record untouched if the result is invalid
    pub fn apply(&mut self, update: &SubnetUpdate) -> SharedResult<()> {
        let ip_version = update.ip_version.unwrap_or(self.ip_version);
        let cidr = update.cidr.unwrap_or(self.cidr);
        let gateway_ip = update.gateway_ip.or(self.gateway_ip);
        let pools = update
            .allocation_pools
            .clone()
            .unwrap_or_else(|| self.allocation_pools.clone());

        validate_subnet_shape(ip_version, &cidr, gateway_ip.as_ref(), &pools)?;

        self.ip_version = ip_version;
        self.cidr = cidr;
        self.gateway_ip = gateway_ip;
        self.allocation_pools = pools;
        Ok(())
    }
}

/// Subnet row with the VLAN of its parent network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetView {
    #[serde(flatten)]
    pub subnet: SubnetRecord,
    pub vlan_id: VlanId,
}
