//! Raw TCP socket transport

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use l2net_core::{DeviceOutcome, DeviceState, ReconcileError, Result, SwitchDriver};
use l2net_shared_types::{DeviceConnection, DeviceOperation, TransportKind, VlanId};

use crate::classify::{classify_reply, Classified};
use crate::templates;

/// Largest command reply read back from the device
pub const MAX_REPLY_BYTES: usize = 4096;
/// Largest `show vlan` listing read back from the device
pub const MAX_LISTING_BYTES: u64 = 64 * 1024;

/// Writes CLI fragments to a TCP socket and classifies the reply.
///
/// Each command opens its own connection; the socket is shut down on every
/// path and dropped if the call is abandoned.
pub struct RawSocketDriver {
    connection: DeviceConnection,
}

impl RawSocketDriver {
    pub fn new(connection: DeviceConnection) -> Self {
        Self { connection }
    }

    async fn connect(&self) -> Result<TcpStream> {
        TcpStream::connect(self.connection.address())
            .await
            .map_err(|e| self.unreachable(e))
    }

    fn unreachable(&self, e: std::io::Error) -> ReconcileError {
        ReconcileError::DeviceUnreachable {
            device: self.connection.name.clone(),
            message: format!("{}: {}", self.connection.address(), e),
        }
    }

    /// Send a command and read a single reply
    async fn exchange(&self, payload: &str) -> Result<String> {
        let mut stream = self.connect().await?;

        let result = async {
            stream.write_all(payload.as_bytes()).await?;
            stream.flush().await?;

            let mut buf = vec![0u8; MAX_REPLY_BYTES];
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(closed_without_reply());
            }
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf[..n]).into_owned())
        }
        .await;

        if let Err(e) = stream.shutdown().await {
            log::debug!("Shutdown of {} failed: {}", self.connection.address(), e);
        }

        result.map_err(|e| self.unreachable(e))
    }

    async fn push(&self, operation: DeviceOperation) -> Result<DeviceOutcome> {
        let payload = templates::cli_fragment(&operation)?;
        log::debug!(
            "Sending to {} ({}): {:?}",
            self.connection.name,
            operation,
            payload
        );

        let reply = self.exchange(&payload).await?;

        match classify_reply(operation.kind(), &reply) {
            Classified::Outcome(outcome) => {
                log::debug!("{} on {}: {:?}", operation, self.connection.name, outcome);
                Ok(outcome)
            }
            Classified::Rejected(reason) => Err(ReconcileError::DeviceRejected {
                device: self.connection.name.clone(),
                operation: operation.to_string(),
                reply: reason,
            }),
            Classified::Unreachable(reason) => Err(ReconcileError::DeviceUnreachable {
                device: self.connection.name.clone(),
                message: reason,
            }),
        }
    }
}

/// A device that hangs up without answering has not applied anything
fn closed_without_reply() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed without a reply",
    )
}

/// Collect VLAN ids from a `show vlan brief` listing
pub fn parse_vlan_listing(listing: &str) -> BTreeSet<VlanId> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|token| token.parse::<u16>().ok())
        .filter_map(|id| VlanId::new(id).ok())
        .collect()
}

#[async_trait]
impl SwitchDriver for RawSocketDriver {
    fn transport(&self) -> TransportKind {
        TransportKind::RawSocket
    }

    fn device(&self) -> &str {
        &self.connection.name
    }

    async fn create_vlan(&self, vlan_id: VlanId, vlan_name: &str) -> Result<DeviceOutcome> {
        self.push(DeviceOperation::CreateVlan {
            vlan_id,
            vlan_name: vlan_name.to_string(),
        })
        .await
    }

    async fn delete_vlan(&self, vlan_id: VlanId) -> Result<DeviceOutcome> {
        self.push(DeviceOperation::DeleteVlan { vlan_id }).await
    }

    async fn enable_trunk(&self, port: &str, vlan_id: VlanId) -> Result<DeviceOutcome> {
        self.push(DeviceOperation::EnableTrunk {
            port: port.to_string(),
            vlan_id,
        })
        .await
    }

    async fn disable_trunk(&self, port: &str, vlan_id: VlanId) -> Result<DeviceOutcome> {
        self.push(DeviceOperation::DisableTrunk {
            port: port.to_string(),
            vlan_id,
        })
        .await
    }

    async fn query_state(&self) -> Result<DeviceState> {
        let mut stream = self.connect().await?;

        let result = async {
            stream
                .write_all(templates::SHOW_VLAN_COMMAND.as_bytes())
                .await?;
            stream.flush().await?;

            let mut listing = String::new();
            (&mut stream)
                .take(MAX_LISTING_BYTES)
                .read_to_string(&mut listing)
                .await?;
            if listing.is_empty() {
                return Err(closed_without_reply());
            }
            Ok::<_, std::io::Error>(listing)
        }
        .await;

        if let Err(e) = stream.shutdown().await {
            log::debug!("Shutdown of {} failed: {}", self.connection.address(), e);
        }

        let listing = result.map_err(|e| self.unreachable(e))?;
        Ok(DeviceState {
            vlan_ids: parse_vlan_listing(&listing),
        })
    }
}
