//! Port trunk commands

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::context::AppContext;
use crate::output::{render, OutputFormat};

pub struct PortCommand {
    context: Arc<AppContext>,
    format: OutputFormat,
}

impl PortCommand {
    pub fn new(context: Arc<AppContext>, format: OutputFormat) -> Self {
        Self { context, format }
    }

    pub async fn attach(&self, network_id: &str, port: &str) -> Result<String> {
        let binding = self
            .context
            .orchestrator
            .attach_port(network_id, port)
            .await
            .with_context(|| format!("Failed to attach {} to network {}", port, network_id))?;
        render(self.format, &binding, |b| {
            format!("Port {} trunks VLAN {}", b.port_id, b.vlan_id)
        })
    }

    pub async fn detach(&self, network_id: &str, port: &str) -> Result<String> {
        let binding = self
            .context
            .orchestrator
            .detach_port(network_id, port)
            .await
            .with_context(|| format!("Failed to detach {} from network {}", port, network_id))?;
        render(self.format, &binding, |b| {
            format!("Port {} no longer trunks VLAN {}", b.port_id, b.vlan_id)
        })
    }
}
