//! l2net CLI
//!
//! Command-line front end for the reconciliation orchestrator: tenant
//! networks, subnets and port trunks, plus device audits and a raw
//! operation call for scripting.

pub mod commands;
pub mod context;
pub mod output;
