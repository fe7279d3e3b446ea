pub mod binding;
pub mod device;
pub mod error;
pub mod events;
pub mod resource;
pub mod vlan;

pub use binding::{PortBinding, SegmentationReservation, VlanBinding};
pub use device::{Credentials, DeviceConnection, DeviceOperation, DeviceOperationKind, TransportKind};
pub use error::{SharedResult, SharedTypeError};
pub use events::SystemEvent;
pub use resource::{
    AllocationPool, NetworkRecord, NetworkRequest, NetworkStatus, NetworkUpdate, NetworkView,
    SubnetRecord, SubnetRequest, SubnetUpdate, SubnetView,
};
pub use vlan::{VlanId, VLAN_ID_MAX, VLAN_ID_MIN};
