//! CLI commands

pub mod audit;
pub mod call;
pub mod config;
pub mod network;
pub mod port;
pub mod subnet;

pub use audit::AuditCommand;
pub use call::CallCommand;
pub use config::ConfigCommand;
pub use network::NetworkCommand;
pub use port::PortCommand;
pub use subnet::SubnetCommand;
