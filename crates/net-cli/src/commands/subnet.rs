//! Subnet commands

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ipnet::IpNet;

use l2net_shared_types::{AllocationPool, SubnetRecord, SubnetRequest, SubnetUpdate, SubnetView};

use crate::context::AppContext;
use crate::output::{render, table, OutputFormat};

pub struct SubnetCommand {
    context: Arc<AppContext>,
    format: OutputFormat,
}

impl SubnetCommand {
    pub fn new(context: Arc<AppContext>, format: OutputFormat) -> Self {
        Self { context, format }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        subnet_id: &str,
        network_id: &str,
        cidr: &str,
        gateway: Option<&str>,
        pools: &[String],
    ) -> Result<String> {
        let cidr = parse_cidr(cidr)?;
        let request = SubnetRequest {
            id: subnet_id.to_string(),
            network_id: network_id.to_string(),
            ip_version: ip_version(&cidr),
            cidr,
            gateway_ip: gateway.map(parse_addr).transpose()?,
            allocation_pools: parse_pools(pools)?,
        };

        let view = self
            .context
            .orchestrator
            .create_subnet(tenant_id, request)
            .await
            .with_context(|| format!("Failed to create subnet {}", subnet_id))?;
        render(self.format, &view, |v| {
            format!(
                "Created subnet {} ({}) on network {}",
                v.subnet.id, v.subnet.cidr, v.subnet.network_id
            )
        })
    }

    pub async fn update(
        &self,
        subnet_id: &str,
        cidr: Option<&str>,
        gateway: Option<&str>,
        pools: &[String],
    ) -> Result<String> {
        let cidr = cidr.map(parse_cidr).transpose()?;
        let update = SubnetUpdate {
            ip_version: cidr.as_ref().map(ip_version),
            cidr,
            gateway_ip: gateway.map(parse_addr).transpose()?,
            allocation_pools: if pools.is_empty() {
                None
            } else {
                Some(parse_pools(pools)?)
            },
        };

        let view = self
            .context
            .orchestrator
            .update_subnet(subnet_id, update)
            .await
            .with_context(|| format!("Failed to update subnet {}", subnet_id))?;
        render(self.format, &view, describe_subnet)
    }

    pub async fn delete(&self, subnet_id: &str) -> Result<String> {
        let removed = self
            .context
            .orchestrator
            .delete_subnet(subnet_id)
            .await
            .with_context(|| format!("Failed to delete subnet {}", subnet_id))?;
        render(self.format, &removed, |r: &SubnetRecord| {
            format!("Deleted subnet {} ({})", r.id, r.cidr)
        })
    }

    pub async fn show(&self, subnet_id: &str) -> Result<String> {
        let view = self.context.orchestrator.get_subnet(subnet_id).await?;
        render(self.format, &view, describe_subnet)
    }

    pub async fn list(&self, network_id: Option<&str>) -> Result<String> {
        let views = self.context.orchestrator.list_subnets(network_id).await?;
        render(self.format, &views, |views| {
            let rows = views
                .iter()
                .map(|v| {
                    vec![
                        v.subnet.id.clone(),
                        v.subnet.network_id.clone(),
                        v.subnet.cidr.to_string(),
                        v.subnet
                            .gateway_ip
                            .map(|gw| gw.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        v.vlan_id.to_string(),
                    ]
                })
                .collect();
            table(&["ID", "Network", "CIDR", "Gateway", "VLAN"], rows)
        })
    }
}

fn describe_subnet(view: &SubnetView) -> String {
    let pools: Vec<String> = view
        .subnet
        .allocation_pools
        .iter()
        .map(|p| format!("{}-{}", p.start, p.end))
        .collect();

    [
        format!("Subnet:    {}", view.subnet.id),
        format!("Network:   {} (VLAN {})", view.subnet.network_id, view.vlan_id),
        format!("CIDR:      {}", view.subnet.cidr),
        format!(
            "Gateway:   {}",
            view.subnet
                .gateway_ip
                .map(|gw| gw.to_string())
                .unwrap_or_else(|| "-".to_string())
        ),
        format!(
            "Pools:     {}",
            if pools.is_empty() {
                "-".to_string()
            } else {
                pools.join(", ")
            }
        ),
    ]
    .join("\n")
}

fn ip_version(cidr: &IpNet) -> u8 {
    match cidr {
        IpNet::V4(_) => 4,
        IpNet::V6(_) => 6,
    }
}

fn parse_cidr(value: &str) -> Result<IpNet> {
    value
        .parse()
        .with_context(|| format!("Invalid CIDR '{}'", value))
}

fn parse_addr(value: &str) -> Result<IpAddr> {
    value
        .parse()
        .with_context(|| format!("Invalid address '{}'", value))
}

/// Pools are given as `start-end`
fn parse_pools(values: &[String]) -> Result<Vec<AllocationPool>> {
    values
        .iter()
        .map(|value| {
            let (start, end) = value
                .split_once('-')
                .ok_or_else(|| anyhow!("Allocation pool '{}' is not start-end", value))?;
            Ok(AllocationPool {
                start: parse_addr(start.trim())?,
                end: parse_addr(end.trim())?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pools() {
        let pools = parse_pools(&["10.0.0.10-10.0.0.20".to_string()]).unwrap();
        assert_eq!(pools[0].start, "10.0.0.10".parse::<IpAddr>().unwrap());
        assert_eq!(pools[0].end, "10.0.0.20".parse::<IpAddr>().unwrap());

        assert!(parse_pools(&["10.0.0.10".to_string()]).is_err());
        assert!(parse_pools(&["a-b".to_string()]).is_err());
    }

    #[test]
    fn test_ip_version_follows_cidr() {
        assert_eq!(ip_version(&parse_cidr("10.0.0.0/24").unwrap()), 4);
        assert_eq!(ip_version(&parse_cidr("2001:db8::/64").unwrap()), 6);
        assert!(parse_cidr("10.0.0.0/40").is_err());
    }
}
