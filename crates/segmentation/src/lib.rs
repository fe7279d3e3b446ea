//! Segmentation allocator
//!
//! Hands out VLAN ids to tenant networks. Every id is unique across tenants:
//! the scan for a free id and the write of the reservation happen in one
//! store transaction, and the store serializes transactions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use l2net_core::{ReconcileError, Result, VlanRange};
use l2net_shared_types::{SegmentationReservation, VlanId};
use l2net_store::Database;

pub struct SegmentationAllocator {
    db: Arc<Database>,
    range: VlanRange,
}

impl SegmentationAllocator {
    pub fn new(db: Arc<Database>, range: VlanRange) -> Self {
        Self { db, range }
    }

    pub fn range(&self) -> VlanRange {
        self.range
    }

    /// Reserve the lowest free VLAN id for a network.
    ///
    /// A network that already holds a reservation gets the same id back, so a
    /// create retried after a crash does not leak ids. A reservation held by
    /// another tenant is never handed over.
    pub async fn reserve(
        &self,
        tenant_id: &str,
        network_id: &str,
        network_name: &str,
    ) -> Result<VlanId> {
        let range = self.range;
        let vlan_id = self
            .db
            .transaction(|tables| {
                if let Some(existing) = tables
                    .segmentation_reservations
                    .iter()
                    .find(|r| r.network_id == network_id)
                {
                    if existing.tenant_id != tenant_id {
                        return Err(ReconcileError::DuplicateBinding {
                            message: format!(
                                "network {} is reserved by tenant {}",
                                network_id, existing.tenant_id
                            ),
                        });
                    }
                    log::debug!(
                        "Network {} already holds VLAN {}",
                        network_id,
                        existing.vlan_id
                    );
                    return Ok(existing.vlan_id);
                }

                let taken: BTreeSet<VlanId> = tables
                    .segmentation_reservations
                    .iter()
                    .map(|r| r.vlan_id)
                    .chain(tables.vlan_bindings.values().map(|b| b.vlan_id))
                    .collect();

                let vlan_id = range
                    .iter()
                    .find(|id| !taken.contains(id))
                    .ok_or(ReconcileError::ExhaustedRange {
                        min: range.min,
                        max: range.max,
                    })?;

                tables.segmentation_reservations.push(SegmentationReservation {
                    tenant_id: tenant_id.to_string(),
                    network_id: network_id.to_string(),
                    network_name: network_name.to_string(),
                    vlan_id,
                    reserved_at: Utc::now(),
                });
                Ok(vlan_id)
            })
            .await?;

        log::info!(
            "Reserved VLAN {} for network {} (tenant {})",
            vlan_id,
            network_id,
            tenant_id
        );
        Ok(vlan_id)
    }

    /// Release the reservation held by a tenant's network. Unknown pairs are a no-op.
    pub async fn release(&self, tenant_id: &str, network_id: &str) -> Result<Option<VlanId>> {
        let released = self
            .db
            .transaction(|tables| {
                let position = tables
                    .segmentation_reservations
                    .iter()
                    .position(|r| r.tenant_id == tenant_id && r.network_id == network_id);
                Ok(position.map(|i| tables.segmentation_reservations.remove(i).vlan_id))
            })
            .await?;

        match released {
            Some(vlan_id) => log::info!(
                "Released VLAN {} of network {} (tenant {})",
                vlan_id,
                network_id,
                tenant_id
            ),
            None => log::debug!(
                "No reservation for network {} (tenant {}), nothing to release",
                network_id,
                tenant_id
            ),
        }
        Ok(released)
    }

    /// Release one specific VLAN id regardless of owner. Unknown ids are a no-op.
    pub async fn release_vlan(&self, vlan_id: VlanId) -> Result<bool> {
        let released = self
            .db
            .transaction(|tables| {
                let before = tables.segmentation_reservations.len();
                tables
                    .segmentation_reservations
                    .retain(|r| r.vlan_id != vlan_id);
                Ok(tables.segmentation_reservations.len() != before)
            })
            .await?;

        if released {
            log::info!("Released VLAN {}", vlan_id);
        }
        Ok(released)
    }

    pub async fn list_reservations(
        &self,
        tenant_id: Option<&str>,
    ) -> Result<Vec<SegmentationReservation>> {
        let mut reservations: Vec<SegmentationReservation> = self
            .db
            .read(|tables| {
                tables
                    .segmentation_reservations
                    .iter()
                    .filter(|r| tenant_id.map_or(true, |t| r.tenant_id == t))
                    .cloned()
                    .collect()
            })
            .await;
        reservations.sort_by_key(|r| r.vlan_id);
        Ok(reservations)
    }

    /// The reservation held for a network, whoever owns it
    pub async fn reservation_for(&self, network_id: &str) -> Option<SegmentationReservation> {
        self.db
            .read(|tables| {
                tables
                    .segmentation_reservations
                    .iter()
                    .find(|r| r.network_id == network_id)
                    .cloned()
            })
            .await
    }

    pub async fn is_reserved(&self, vlan_id: VlanId) -> bool {
        self.db
            .read(|tables| {
                tables
                    .segmentation_reservations
                    .iter()
                    .any(|r| r.vlan_id == vlan_id)
            })
            .await
    }
}
