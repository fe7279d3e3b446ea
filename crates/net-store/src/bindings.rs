//! Binding store over the table database

use std::sync::Arc;

use async_trait::async_trait;

use l2net_core::{BindingStore, ReconcileError, Result};
use l2net_shared_types::{PortBinding, VlanBinding, VlanId};

use crate::database::Database;

/// `vlan_bindings` and `port_bindings` tables
#[derive(Debug, Clone)]
pub struct DbBindingStore {
    db: Arc<Database>,
}

impl DbBindingStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BindingStore for DbBindingStore {
    async fn add_vlan_binding(
        &self,
        vlan_id: VlanId,
        vlan_name: &str,
        network_id: &str,
    ) -> Result<VlanBinding> {
        self.db
            .transaction(|tables| {
                if let Some(existing) = tables.vlan_bindings.get(network_id) {
                    if existing.same_values(vlan_id, vlan_name, network_id) {
                        return Ok(existing.clone());
                    }
                    return Err(ReconcileError::DuplicateBinding {
                        message: format!(
                            "network {} is already bound to VLAN {} ({})",
                            network_id, existing.vlan_id, existing.vlan_name
                        ),
                    });
                }

                if let Some(owner) = tables
                    .vlan_bindings
                    .values()
                    .find(|binding| binding.vlan_id == vlan_id)
                {
                    return Err(ReconcileError::DuplicateBinding {
                        message: format!(
                            "VLAN {} is already bound to network {}",
                            vlan_id, owner.network_id
                        ),
                    });
                }

                let binding = VlanBinding::new(network_id, vlan_id, vlan_name);
                tables
                    .vlan_bindings
                    .insert(network_id.to_string(), binding.clone());
                log::debug!("Bound network {} to VLAN {}", network_id, vlan_id);
                Ok(binding)
            })
            .await
    }

    async fn remove_vlan_binding(&self, network_id: &str) -> Result<Option<VlanBinding>> {
        self.db
            .transaction(|tables| Ok(tables.vlan_bindings.remove(network_id)))
            .await
    }

    async fn get_vlan_binding(&self, network_id: &str) -> Result<VlanBinding> {
        self.db
            .read(|tables| tables.vlan_bindings.get(network_id).cloned())
            .await
            .ok_or_else(|| ReconcileError::BindingNotFound {
                network_id: network_id.to_string(),
            })
    }

    async fn list_vlan_bindings(&self) -> Result<Vec<VlanBinding>> {
        let mut bindings: Vec<VlanBinding> = self
            .db
            .read(|tables| tables.vlan_bindings.values().cloned().collect())
            .await;
        bindings.sort_by_key(|binding| binding.vlan_id);
        Ok(bindings)
    }

    async fn add_port_binding(&self, port_id: &str, vlan_id: VlanId) -> Result<PortBinding> {
        self.db
            .transaction(|tables| {
                let binding = PortBinding::new(port_id, vlan_id);
                if !tables.port_bindings.contains(&binding) {
                    tables.port_bindings.push(binding.clone());
                }
                Ok(binding)
            })
            .await
    }

    async fn remove_port_binding(&self, vlan_id: VlanId) -> Result<Vec<PortBinding>> {
        self.db
            .transaction(|tables| {
                let (removed, kept): (Vec<_>, Vec<_>) = tables
                    .port_bindings
                    .drain(..)
                    .partition(|binding| binding.vlan_id == vlan_id);
                tables.port_bindings = kept;
                Ok(removed)
            })
            .await
    }

    async fn remove_port_from_vlan(&self, port_id: &str, vlan_id: VlanId) -> Result<PortBinding> {
        self.db
            .transaction(|tables| {
                let position = tables
                    .port_bindings
                    .iter()
                    .position(|binding| binding.port_id == port_id && binding.vlan_id == vlan_id)
                    .ok_or_else(|| ReconcileError::PortBindingNotFound {
                        port_id: port_id.to_string(),
                        vlan_id,
                    })?;
                Ok(tables.port_bindings.remove(position))
            })
            .await
    }

    async fn list_port_bindings(&self, vlan_id: VlanId) -> Result<Vec<PortBinding>> {
        Ok(self
            .db
            .read(|tables| {
                tables
                    .port_bindings
                    .iter()
                    .filter(|binding| binding.vlan_id == vlan_id)
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn list_all_port_bindings(&self) -> Result<Vec<PortBinding>> {
        Ok(self.db.read(|tables| tables.port_bindings.clone()).await)
    }
}
