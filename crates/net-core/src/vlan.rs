//! VLAN naming and range handling

use serde::{Deserialize, Serialize};

pub use l2net_shared_types::{VlanId, VLAN_ID_MAX, VLAN_ID_MIN};

use crate::error::ReconcileError;
use crate::Result;

/// Prefix prepended to the network id to form a VLAN name
pub const DEFAULT_VLAN_NAME_PREFIX: &str = "q-";

/// Switch-side VLAN names are capped at this many characters
pub const MAX_VLAN_NAME_LEN: usize = 32;

/// Derive the device VLAN name for a network.
///
/// Deterministic so a retried create always pushes the same name.
pub fn derive_vlan_name(prefix: &str, network_id: &str) -> String {
    let mut name = format!("{}{}", prefix, network_id);
    if name.len() > MAX_VLAN_NAME_LEN {
        let mut cut = MAX_VLAN_NAME_LEN;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    name
}

/// Inclusive range of VLAN ids the allocator may hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanRange {
    pub min: VlanId,
    pub max: VlanId,
}

impl VlanRange {
    pub fn new(min: u16, max: u16) -> Result<Self> {
        let range = Self {
            min: VlanId::new(min)?,
            max: VlanId::new(max)?,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(ReconcileError::Configuration {
                message: format!("VLAN range {}-{} is empty", self.min, self.max),
            });
        }
        Ok(())
    }

    pub fn contains(&self, vlan_id: VlanId) -> bool {
        vlan_id >= self.min && vlan_id <= self.max
    }

    /// Ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = VlanId> {
        (self.min.get()..=self.max.get()).filter_map(|id| VlanId::new(id).ok())
    }

    pub fn len(&self) -> usize {
        usize::from(self.max.get() - self.min.get()) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl Default for VlanRange {
    fn default() -> Self {
        Self {
            min: VlanId::MIN,
            max: VlanId::MAX,
        }
    }
}
