//! Network commands

use std::sync::Arc;

use anyhow::{Context, Result};

use l2net_orchestrator::DeleteOutcome;
use l2net_shared_types::{NetworkRequest, NetworkUpdate, NetworkView};

use crate::context::AppContext;
use crate::output::{render, table, OutputFormat};

pub struct NetworkCommand {
    context: Arc<AppContext>,
    format: OutputFormat,
}

impl NetworkCommand {
    pub fn new(context: Arc<AppContext>, format: OutputFormat) -> Self {
        Self { context, format }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        network_id: &str,
        name: &str,
        admin_down: bool,
    ) -> Result<String> {
        let mut request = NetworkRequest::new(network_id, name);
        request.admin_state_up = !admin_down;

        let view = self
            .context
            .orchestrator
            .create_network(tenant_id, request)
            .await
            .with_context(|| format!("Failed to create network {}", network_id))?;
        render(self.format, &view, |v| {
            format!(
                "Created network {} on VLAN {} ({})",
                v.network.id, v.vlan_id, v.vlan_name
            )
        })
    }

    pub async fn delete(&self, tenant_id: &str, network_id: &str) -> Result<String> {
        let outcome = self
            .context
            .orchestrator
            .delete_network(tenant_id, network_id)
            .await
            .with_context(|| format!("Failed to delete network {}", network_id))?;
        render(self.format, &outcome, describe_delete)
    }

    pub async fn show(&self, network_id: &str) -> Result<String> {
        let view = self.context.orchestrator.get_network(network_id).await?;
        render(self.format, &view, describe_network)
    }

    pub async fn list(&self, tenant_id: Option<&str>) -> Result<String> {
        let views = self.context.orchestrator.list_networks(tenant_id).await?;
        render(self.format, &views, |views| {
            let rows = views
                .iter()
                .map(|v| {
                    vec![
                        v.network.id.clone(),
                        v.network.tenant_id.clone(),
                        v.network.name.clone(),
                        v.vlan_id.to_string(),
                        format!("{:?}", v.network.status).to_uppercase(),
                    ]
                })
                .collect();
            table(&["ID", "Tenant", "Name", "VLAN", "Status"], rows)
        })
    }

    pub async fn update(
        &self,
        network_id: &str,
        name: Option<String>,
        admin_state_up: Option<bool>,
    ) -> Result<String> {
        let view = self
            .context
            .orchestrator
            .update_network(
                network_id,
                NetworkUpdate {
                    name,
                    admin_state_up,
                },
            )
            .await
            .with_context(|| format!("Failed to update network {}", network_id))?;
        render(self.format, &view, describe_network)
    }
}

fn describe_network(view: &NetworkView) -> String {
    let ports = if view.ports.is_empty() {
        "-".to_string()
    } else {
        view.ports.join(", ")
    };
    let subnets = if view.network.subnets.is_empty() {
        "-".to_string()
    } else {
        view.network.subnets.join(", ")
    };

    [
        format!("Network:   {}", view.network.id),
        format!("Name:      {}", view.network.name),
        format!("Tenant:    {}", view.network.tenant_id),
        format!("Status:    {:?}", view.network.status),
        format!("VLAN:      {} ({})", view.vlan_id, view.vlan_name),
        format!("Ports:     {}", ports),
        format!("Subnets:   {}", subnets),
        format!("Created:   {}", view.network.created_at.to_rfc3339()),
    ]
    .join("\n")
}

fn describe_delete(outcome: &DeleteOutcome) -> String {
    let Some(vlan_id) = outcome.vlan_id else {
        return format!("Network {} was already deleted", outcome.network_id);
    };

    let mut lines = vec![format!(
        "Deleted network {} (VLAN {})",
        outcome.network_id, vlan_id
    )];
    if !outcome.detached_ports.is_empty() {
        lines.push(format!(
            "Detached ports: {}",
            outcome.detached_ports.join(", ")
        ));
    }
    for error in &outcome.device_errors {
        lines.push(format!("Warning: device cleanup failed: {}", error));
    }
    lines.join("\n")
}
