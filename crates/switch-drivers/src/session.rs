//! Managed-session transport
//!
//! Opens an authenticated session on the switch management API, sends one
//! structured edit-config payload and closes the session again.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use l2net_core::{DeviceOutcome, DeviceState, ReconcileError, Result, SwitchDriver};
use l2net_shared_types::{Credentials, DeviceConnection, DeviceOperation, TransportKind, VlanId};

use crate::classify::{classify_status, Classified};
use crate::templates;

pub const SESSION_HEADER: &str = "X-Session-Token";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: Option<&'a str>,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct VlanEntry {
    id: u16,
}

#[derive(Deserialize)]
struct VlanListing {
    vlans: Vec<VlanEntry>,
}

/// Closes the session when dropped, also when the call is abandoned mid-flight
struct SessionGuard {
    client: Client,
    url: String,
    closed: bool,
}

impl SessionGuard {
    async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.client.delete(&self.url).send().await {
            log::warn!("Failed to close session {}: {}", self.url, e);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let client = self.client.clone();
        let url = std::mem::take(&mut self.url);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.delete(&url).send().await {
                        log::warn!("Failed to close abandoned session {}: {}", url, e);
                    }
                });
            }
            Err(_) => log::warn!("Session {} left open, no runtime to close it", url),
        }
    }
}

pub struct SessionDriver {
    connection: DeviceConnection,
    credentials: Credentials,
    client: Client,
    base_url: String,
}

impl SessionDriver {
    pub fn new(connection: DeviceConnection) -> Result<Self> {
        let credentials = connection
            .credentials
            .clone()
            .ok_or_else(|| ReconcileError::Configuration {
                message: format!("switch {} requires credentials for sessions", connection.name),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReconcileError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let scheme = if connection.use_tls { "https" } else { "http" };
        let base_url = format!("{}://{}", scheme, connection.address());

        Ok(Self {
            connection,
            credentials,
            client,
            base_url,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ReconcileError {
        ReconcileError::DeviceUnreachable {
            device: self.connection.name.clone(),
            message: e.to_string(),
        }
    }

    async fn open_session(&self) -> Result<(String, SessionGuard)> {
        let url = format!("{}/api/v1/sessions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &self.credentials.username,
                password: self.credentials.password.as_deref(),
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                502 | 503 | 504 => ReconcileError::DeviceUnreachable {
                    device: self.connection.name.clone(),
                    message: format!("session login failed: {} - {}", status, text),
                },
                _ => ReconcileError::DeviceRejected {
                    device: self.connection.name.clone(),
                    operation: "open_session".to_string(),
                    reply: format!("{} - {}", status, text),
                },
            });
        }

        let login: LoginResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        let guard = SessionGuard {
            client: self.client.clone(),
            url: format!(
                "{}/api/v1/sessions/{}",
                self.base_url,
                urlencoding::encode(&login.token)
            ),
            closed: false,
        };
        log::debug!("Opened session on {}", self.connection.name);
        Ok((login.token, guard))
    }

    async fn send_edit(
        &self,
        token: &str,
        operation: &DeviceOperation,
        payload: &Value,
    ) -> Result<DeviceOutcome> {
        let response = self
            .client
            .post(format!("{}/api/v1/edit-config", self.base_url))
            .header(SESSION_HEADER, token)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match classify_status(operation.kind(), status, &body) {
            Classified::Outcome(outcome) => Ok(outcome),
            Classified::Rejected(reply) => Err(ReconcileError::DeviceRejected {
                device: self.connection.name.clone(),
                operation: operation.to_string(),
                reply,
            }),
            Classified::Unreachable(message) => Err(ReconcileError::DeviceUnreachable {
                device: self.connection.name.clone(),
                message,
            }),
        }
    }

    async fn push(&self, operation: DeviceOperation) -> Result<DeviceOutcome> {
        let payload = templates::edit_config(&operation)?;
        log::debug!("Sending to {} ({}): {}", self.connection.name, operation, payload);

        let (token, guard) = self.open_session().await?;
        let result = self.send_edit(&token, &operation, &payload).await;
        guard.close().await;

        if let Ok(outcome) = &result {
            log::debug!("{} on {}: {:?}", operation, self.connection.name, outcome);
        }
        result
    }
}

#[async_trait]
impl SwitchDriver for SessionDriver {
    fn transport(&self) -> TransportKind {
        TransportKind::Session
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
        let (token, guard) = self.open_session().await?;

        let result = async {
            let response = self
                .client
                .get(format!("{}/api/v1/vlans", self.base_url))
                .header(SESSION_HEADER, &token)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if !response.status().is_success() {
                return Err(ReconcileError::DeviceRejected {
                    device: self.connection.name.clone(),
                    operation: "query_state".to_string(),
                    reply: response.status().to_string(),
                });
            }

            let listing: VlanListing =
                response.json().await.map_err(|e| self.transport_error(e))?;
            let vlan_ids: BTreeSet<VlanId> = listing
                .vlans
                .iter()
                .filter_map(|entry| VlanId::new(entry.id).ok())
                .collect();
            Ok(DeviceState { vlan_ids })
        }
        .await;

        guard.close().await;
        result
    }
}
