//! Error types for VLAN reconciliation

use thiserror::Error;

use l2net_shared_types::{SharedTypeError, VlanId};

/// Main error type for reconciliation operations
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No free VLAN id left in range {min}-{max}")]
    ExhaustedRange { min: VlanId, max: VlanId },

    #[error("Duplicate binding: {message}")]
    DuplicateBinding { message: String },

    #[error("No VLAN binding for network {network_id}")]
    BindingNotFound { network_id: String },

    #[error("Network not found: {network_id}")]
    NetworkNotFound { network_id: String },

    #[error("Subnet not found: {subnet_id}")]
    SubnetNotFound { subnet_id: String },

    #[error("Port {port_id} is not bound to VLAN {vlan_id}")]
    PortBindingNotFound { port_id: String, vlan_id: VlanId },

    #[error("Device {device} unreachable: {message}")]
    DeviceUnreachable { device: String, message: String },

    #[error("Device {device} timed out after {timeout_ms}ms during {operation}")]
    DeviceTimeout {
        device: String,
        operation: String,
        timeout_ms: u64,
    },

    #[error("Device {device} rejected {operation}: {reply}")]
    DeviceRejected {
        device: String,
        operation: String,
        reply: String,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    pub fn store(message: impl Into<String>) -> Self {
        ReconcileError::Store {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ReconcileError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReconcileError::BindingNotFound { .. }
                | ReconcileError::NetworkNotFound { .. }
                | ReconcileError::SubnetNotFound { .. }
                | ReconcileError::PortBindingNotFound { .. }
        )
    }

    /// Errors worth retrying against the device
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReconcileError::DeviceUnreachable { .. } | ReconcileError::DeviceTimeout { .. }
        )
    }

    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            ReconcileError::DeviceUnreachable { .. }
                | ReconcileError::DeviceTimeout { .. }
                | ReconcileError::DeviceRejected { .. }
        )
    }
}

impl From<SharedTypeError> for ReconcileError {
    fn from(err: SharedTypeError) -> Self {
        ReconcileError::InvalidRequest {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = ReconcileError::DeviceTimeout {
            device: "sw1".to_string(),
            operation: "create_vlan".to_string(),
            timeout_ms: 10_000,
        };
        assert!(timeout.is_transient());
        assert!(timeout.is_device_error());
        assert!(!timeout.is_not_found());

        let rejected = ReconcileError::DeviceRejected {
            device: "sw1".to_string(),
            operation: "create_vlan".to_string(),
            reply: "% Invalid input".to_string(),
        };
        assert!(!rejected.is_transient());
        assert!(rejected.is_device_error());

        let missing = ReconcileError::BindingNotFound {
            network_id: "net-1".to_string(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_device_error());
    }

    #[test]
    fn test_shared_type_error_becomes_invalid_request() {
        let err: ReconcileError = SharedTypeError::ParseError("bad vlan".to_string()).into();
        assert!(matches!(err, ReconcileError::InvalidRequest { .. }));
    }
}
