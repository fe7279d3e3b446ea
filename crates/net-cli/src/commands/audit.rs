//! Device audit and allocation inspection

use std::sync::Arc;

use anyhow::Result;

use crate::context::AppContext;
use crate::output::{render, table, OutputFormat};

pub struct AuditCommand {
    context: Arc<AppContext>,
    format: OutputFormat,
}

impl AuditCommand {
    pub fn new(context: Arc<AppContext>, format: OutputFormat) -> Self {
        Self { context, format }
    }

    /// Compare bindings with the VLANs the switch reports
    pub async fn audit(&self) -> Result<String> {
        let report = self.context.orchestrator.audit().await?;
        render(self.format, &report, |r| {
            if r.in_sync() {
                return format!("{}: in sync", r.device);
            }

            let mut lines = vec![format!("{}: out of sync", r.device)];
            for binding in &r.missing_on_device {
                lines.push(format!(
                    "  missing on device: VLAN {} ({}) for network {}",
                    binding.vlan_id, binding.vlan_name, binding.network_id
                ));
            }
            for vlan_id in &r.unknown_on_device {
                lines.push(format!("  unknown on device: VLAN {}", vlan_id));
            }
            lines.join("\n")
        })
    }

    pub async fn reservations(&self, tenant_id: Option<&str>) -> Result<String> {
        let reservations = self
            .context
            .orchestrator
            .list_reservations(tenant_id)
            .await?;
        render(self.format, &reservations, |reservations| {
            let rows = reservations
                .iter()
                .map(|r| {
                    vec![
                        r.vlan_id.to_string(),
                        r.tenant_id.clone(),
                        r.network_id.clone(),
                        r.reserved_at.to_rfc3339(),
                    ]
                })
                .collect();
            table(&["VLAN", "Tenant", "Network", "Reserved"], rows)
        })
    }
}
