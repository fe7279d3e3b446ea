//! l2net reconciliation orchestrator
//!
//! Drives the segmentation allocator, the binding store and a switch driver
//! so that every logical network operation either completes on both the
//! model and the device or leaves neither changed.

pub mod dispatch;
pub mod invoker;
pub mod locks;
pub mod orchestrator;

#[cfg(test)]
mod tests;

pub use dispatch::LogicalOperation;
pub use invoker::{DriverInvoker, InvokePolicy};
pub use locks::{NetworkGuard, NetworkLocks};
pub use orchestrator::{AuditReport, DeleteOutcome, Orchestrator, OrchestratorSettings};
