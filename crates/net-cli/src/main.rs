//! l2net CLI (l2netctl)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use l2netctl::commands::{
    AuditCommand, CallCommand, ConfigCommand, NetworkCommand, PortCommand, SubnetCommand,
};
use l2netctl::context::AppContext;
use l2netctl::output::OutputFormat;

#[derive(Parser)]
#[command(name = "l2netctl")]
#[command(about = "Tenant VLAN reconciliation CLI")]
#[command(version)]
#[command(long_about = "
Tenant VLAN reconciliation CLI

Creates tenant networks by reserving a VLAN id, recording the binding and
pushing the VLAN to the configured switch. Failed pushes are rolled back so
the store and the switch never disagree.

Examples:
  l2netctl network create -t tenant1 net-a blue     # Create a network
  l2netctl network list -t tenant1                  # List tenant networks
  l2netctl network delete -t tenant1 net-a          # Delete a network
  l2netctl subnet create -t tenant1 sub-1 net-a 10.0.0.0/24 -g 10.0.0.1
  l2netctl port attach net-a Gi1/0/12               # Trunk an extra port
  l2netctl audit                                    # Compare store and switch
  l2netctl call get_network '{\"network_id\":\"net-a\"}'
")]
struct Cli {
    /// Configuration file (defaults to /etc/l2net/l2net.toml or ./l2net.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tenant networks
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },

    /// Manage subnets of tenant networks
    Subnet {
        #[command(subcommand)]
        action: SubnetAction,
    },

    /// Trunk or untrunk a network's VLAN on a switch port
    Port {
        #[command(subcommand)]
        action: PortAction,
    },

    /// Compare VLAN bindings with the switch
    Audit,

    /// List VLAN id reservations
    Reservations {
        /// Only this tenant's reservations
        #[arg(short, long)]
        tenant: Option<String>,
    },

    /// Run a logical operation by name with JSON arguments
    Call {
        /// Operation name, e.g. create_network
        operation: Option<String>,

        /// JSON argument object
        args: Option<String>,

        /// List operation names
        #[arg(short, long)]
        list: bool,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum NetworkAction {
    /// Create a network and push its VLAN
    Create {
        #[arg(short, long)]
        tenant: String,
        id: String,
        name: String,
        /// Create administratively down
        #[arg(long)]
        down: bool,
    },

    /// Delete a network and remove its VLAN from the switch
    Delete {
        #[arg(short, long)]
        tenant: String,
        id: String,
    },

    Show {
        id: String,
    },

    List {
        #[arg(short, long)]
        tenant: Option<String>,
    },

    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        admin_state_up: Option<bool>,
    },
}

#[derive(Subcommand)]
enum SubnetAction {
    Create {
        #[arg(short, long)]
        tenant: String,
        id: String,
        network: String,
        cidr: String,
        #[arg(short, long)]
        gateway: Option<String>,
        /// Allocation pool as start-end, repeatable
        #[arg(short, long)]
        pool: Vec<String>,
    },

    Update {
        id: String,
        #[arg(long)]
        cidr: Option<String>,
        #[arg(short, long)]
        gateway: Option<String>,
        #[arg(short, long)]
        pool: Vec<String>,
    },

    Delete {
        id: String,
    },

    Show {
        id: String,
    },

    List {
        #[arg(short, long)]
        network: Option<String>,
    },
}

#[derive(Subcommand)]
enum PortAction {
    Attach { network: String, port: String },
    Detach { network: String, port: String },
}

async fn run(cli: Cli) -> Result<String> {
    if let Commands::Call { list: true, .. } = &cli.command {
        return Ok(CallCommand::operations());
    }

    let context = AppContext::bootstrap(cli.config.as_deref()).await?;
    let format = cli.format;

    match cli.command {
        Commands::Network { action } => {
            let cmd = NetworkCommand::new(context, format);
            match action {
                NetworkAction::Create {
                    tenant,
                    id,
                    name,
                    down,
                } => cmd.create(&tenant, &id, &name, down).await,
                NetworkAction::Delete { tenant, id } => cmd.delete(&tenant, &id).await,
                NetworkAction::Show { id } => cmd.show(&id).await,
                NetworkAction::List { tenant } => cmd.list(tenant.as_deref()).await,
                NetworkAction::Update {
                    id,
                    name,
                    admin_state_up,
                } => cmd.update(&id, name, admin_state_up).await,
            }
        }

        Commands::Subnet { action } => {
            let cmd = SubnetCommand::new(context, format);
            match action {
                SubnetAction::Create {
                    tenant,
                    id,
                    network,
                    cidr,
                    gateway,
                    pool,
                } => {
                    cmd.create(&tenant, &id, &network, &cidr, gateway.as_deref(), &pool)
                        .await
                }
                SubnetAction::Update {
                    id,
                    cidr,
                    gateway,
                    pool,
                } => {
                    cmd.update(&id, cidr.as_deref(), gateway.as_deref(), &pool)
                        .await
                }
                SubnetAction::Delete { id } => cmd.delete(&id).await,
                SubnetAction::Show { id } => cmd.show(&id).await,
                SubnetAction::List { network } => cmd.list(network.as_deref()).await,
            }
        }

        Commands::Port { action } => {
            let cmd = PortCommand::new(context, format);
            match action {
                PortAction::Attach { network, port } => cmd.attach(&network, &port).await,
                PortAction::Detach { network, port } => cmd.detach(&network, &port).await,
            }
        }

        Commands::Audit => AuditCommand::new(context, format).audit().await,

        Commands::Reservations { tenant } => {
            AuditCommand::new(context, format)
                .reservations(tenant.as_deref())
                .await
        }

        Commands::Call {
            operation, args, ..
        } => {
            let operation =
                operation.ok_or_else(|| anyhow::anyhow!("call needs an operation name"))?;
            CallCommand::new(context)
                .execute(&operation, args.as_deref())
                .await
        }

        Commands::Config => ConfigCommand::new(context).show(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let quiet = cli.quiet;
    let chain = cli.verbose || cli.debug;

    match run(cli).await {
        Ok(output) => {
            if !quiet {
                println!("{}", output);
                log::info!("Command completed successfully");
            }
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);

            // Print error chain if in verbose mode
            if chain {
                for cause in e.chain().skip(1) {
                    eprintln!("  Caused by: {}", cause);
                }
            }
            std::process::exit(1);
        }
    }
}
