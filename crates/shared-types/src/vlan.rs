use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};

/// Lowest usable 802.1Q VLAN id
pub const VLAN_ID_MIN: u16 = 1;
/// Highest usable 802.1Q VLAN id (4095 is reserved)
pub const VLAN_ID_MAX: u16 = 4094;

/// A validated 802.1Q VLAN identifier in `1..=4094`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: VlanId = VlanId(VLAN_ID_MIN);
    pub const MAX: VlanId = VlanId(VLAN_ID_MAX);

    pub fn new(id: u16) -> SharedResult<Self> {
        if !(VLAN_ID_MIN..=VLAN_ID_MAX).contains(&id) {
            return Err(SharedTypeError::InvalidValue {
                field: "vlan_id",
                value: id.to_string(),
            });
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for VlanId {
    type Error = SharedTypeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        VlanId::new(value)
    }
}

impl From<VlanId> for u16 {
    fn from(value: VlanId) -> Self {
        value.0
    }
}

impl FromStr for VlanId {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u16 = s
            .trim()
            .parse()
            .map_err(|_| SharedTypeError::ParseError(format!("'{}' is not a VLAN id", s)))?;
        VlanId::new(raw)
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
