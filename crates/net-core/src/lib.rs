//! l2net core
//!
//! Error taxonomy, VLAN naming and the contracts between the allocator,
//! the binding store, switch drivers and the orchestrator.

pub mod driver;
pub mod error;
pub mod store;
pub mod vlan;

pub use driver::{DeviceOutcome, DeviceState, SwitchDriver};
pub use error::ReconcileError;
pub use store::{BindingStore, ResourceStore};
pub use vlan::{derive_vlan_name, VlanId, VlanRange, DEFAULT_VLAN_NAME_PREFIX};

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;
