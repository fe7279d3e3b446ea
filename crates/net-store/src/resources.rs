//! Network and subnet rows

use std::sync::Arc;

use async_trait::async_trait;

use l2net_core::{ReconcileError, ResourceStore, Result};
use l2net_shared_types::{NetworkRecord, SubnetRecord};

use crate::database::Database;

#[derive(Debug, Clone)]
pub struct DbResourceStore {
    db: Arc<Database>,
}

impl DbResourceStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResourceStore for DbResourceStore {
    async fn put_network(&self, network: NetworkRecord) -> Result<()> {
        self.db
            .transaction(|tables| {
                tables.networks.insert(network.id.clone(), network);
                Ok(())
            })
            .await
    }

    async fn get_network(&self, network_id: &str) -> Result<NetworkRecord> {
        self.db
            .read(|tables| tables.networks.get(network_id).cloned())
            .await
            .ok_or_else(|| ReconcileError::NetworkNotFound {
                network_id: network_id.to_string(),
            })
    }

    async fn list_networks(&self, tenant_id: Option<&str>) -> Result<Vec<NetworkRecord>> {
        Ok(self
            .db
            .read(|tables| {
                tables
                    .networks
                    .values()
                    .filter(|network| tenant_id.map_or(true, |t| network.tenant_id == t))
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn remove_network(&self, network_id: &str) -> Result<Option<NetworkRecord>> {
        self.db
            .transaction(|tables| {
                let removed = tables.networks.remove(network_id);
                tables
                    .subnets
                    .retain(|_, subnet| subnet.network_id != network_id);
                Ok(removed)
            })
            .await
    }

    async fn put_subnet(&self, subnet: SubnetRecord) -> Result<()> {
        self.db
            .transaction(|tables| {
                let network = tables.networks.get_mut(&subnet.network_id).ok_or_else(|| {
                    ReconcileError::NetworkNotFound {
                        network_id: subnet.network_id.clone(),
                    }
                })?;
                if !network.subnets.contains(&subnet.id) {
                    network.subnets.push(subnet.id.clone());
                }
                tables.subnets.insert(subnet.id.clone(), subnet);
                Ok(())
            })
            .await
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetRecord> {
        self.db
            .read(|tables| tables.subnets.get(subnet_id).cloned())
            .await
            .ok_or_else(|| ReconcileError::SubnetNotFound {
                subnet_id: subnet_id.to_string(),
            })
    }

    async fn list_subnets(&self, network_id: Option<&str>) -> Result<Vec<SubnetRecord>> {
        Ok(self
            .db
            .read(|tables| {
                tables
                    .subnets
                    .values()
                    .filter(|subnet| network_id.map_or(true, |n| subnet.network_id == n))
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn remove_subnet(&self, subnet_id: &str) -> Result<Option<SubnetRecord>> {
        self.db
            .transaction(|tables| {
                let removed = tables.subnets.remove(subnet_id);
                if let Some(subnet) = &removed {
                    if let Some(network) = tables.networks.get_mut(&subnet.network_id) {
                        network.subnets.retain(|id| id != subnet_id);
                    }
                }
                Ok(removed)
            })
            .await
    }
}
